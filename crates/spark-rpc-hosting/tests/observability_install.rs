//! 全局订阅者只能安装一次；独立测试进程避免与其他测试争用全局状态。

use spark_rpc_hosting::{ObservabilityError, observability};

#[test]
fn second_install_is_rejected() {
    observability::install("info").expect("first install");
    tracing::info!("observability installed");

    let err = observability::install("debug").expect_err("second install");
    assert!(matches!(err, ObservabilityError::AlreadyInstalled));
    assert_eq!(err.code(), "spark.rpc.observability.already_installed");
}
