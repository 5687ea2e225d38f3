//! 绑定字符串语法的属性测试：四种合法形式原样保留地址，缺少 scheme 的文本一律拒绝。

use proptest::prelude::*;
use spark_rpc_bind::{MalformedBindAddress, TransportKind, resolve};

proptest! {
    #[test]
    fn tcp_scheme_keeps_address_verbatim(address in "[ -~]{0,40}") {
        let descriptor = resolve(&format!("tcp://{address}")).expect("tcp bind");
        prop_assert_eq!(descriptor.transport(), TransportKind::Tcp);
        prop_assert_eq!(descriptor.address(), address.as_str());
    }

    #[test]
    fn unix_scheme_keeps_address_verbatim(address in "[ -~]{0,40}") {
        let descriptor = resolve(&format!("unix://{address}")).expect("unix bind");
        prop_assert_eq!(descriptor.transport(), TransportKind::Unix);
        prop_assert_eq!(descriptor.address(), address.as_str());
    }

    #[test]
    fn leading_slash_is_unix_path(rest in "[ -~]{0,40}") {
        let bind = format!("/{rest}");
        let descriptor = resolve(&bind).expect("absolute path");
        prop_assert_eq!(descriptor.transport(), TransportKind::Unix);
        prop_assert_eq!(descriptor.address(), bind.as_str());
    }

    #[test]
    fn leading_colon_is_tcp_address(rest in "[ -~]{0,40}") {
        let bind = format!(":{rest}");
        let descriptor = resolve(&bind).expect("port only");
        prop_assert_eq!(descriptor.transport(), TransportKind::Tcp);
        prop_assert_eq!(descriptor.address(), bind.as_str());
    }

    #[test]
    fn bare_words_are_missing_scheme(bind in "[a-z0-9][a-z0-9._-]{0,20}") {
        prop_assert_eq!(
            resolve(&bind),
            Err(MalformedBindAddress::MissingScheme { bind: bind.clone() })
        );
    }

    #[test]
    fn unknown_schemes_are_rejected(scheme in "[a-z][a-z0-9]{0,8}", rest in "[ -~]{0,20}") {
        prop_assume!(scheme != "tcp" && scheme != "unix");
        let err = resolve(&format!("{scheme}://{rest}")).expect_err("unknown scheme");
        prop_assert_eq!(err.code(), "spark.rpc.bind.unsupported_scheme");
    }
}
