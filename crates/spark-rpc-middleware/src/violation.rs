//! 把校验失败渲染为远端可见的 [`Status`]。

use std::fmt;

use spark_rpc_contract::{Code, FieldPathElement, Status, ValidationFailure};

/// 被校验的消息方向。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Part {
    Request,
    Reply,
}

impl Part {
    pub const fn as_str(self) -> &'static str {
        match self {
            Part::Request => "request",
            Part::Reply => "reply",
        }
    }

    /// 该方向校验失败时使用的状态码：请求是调用方的错，响应是服务端的错。
    pub const fn failure_code(self) -> Code {
        match self {
            Part::Request => Code::InvalidArgument,
            Part::Reply => Code::Internal,
        }
    }
}

impl fmt::Display for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 渲染字段路径：每段为字段名加可选下标，段间以 `.` 连接。
///
/// 例如 `[items, Index(2)] + [sku]` 渲染为 `items[2].sku`；空路径渲染为空串。
pub fn format_field_path(path: &[FieldPathElement]) -> String {
    let mut rendered = String::new();
    for (position, element) in path.iter().enumerate() {
        if position > 0 {
            rendered.push('.');
        }
        rendered.push_str(&element.name);
        if let Some(subscript) = &element.subscript {
            rendered.push_str(&subscript.to_string());
        }
    }
    rendered
}

/// 将校验失败转换为状态。
///
/// # 教案式说明
/// - **意图（Why）**：人读的消息只需指出第一处问题，机器可读的完整违规集合随明细下发，
///   客户端无需解析文本即可定位全部字段；
/// - **契约（What）**：
///   - 状态码由 [`Part::failure_code`] 决定；
///   - 消息为 `invalid <part>: <field path>: <message>`，取自首条违规；
///   - 明细恰好一条，即 [`ValidationFailure::raw_detail`] 的原样副本；
/// - **风险（Trade-offs）**：违规消息由校验引擎生成，可能包含字段取值，调用方应确保约束消息
///   本身不泄露敏感数据。
pub fn violation_status(part: Part, failure: &ValidationFailure) -> Status {
    let first = failure.first();
    let message = format!(
        "invalid {part}: {}: {}",
        format_field_path(&first.field_path),
        first.message
    );
    Status::with_details(
        part.failure_code(),
        message,
        vec![failure.raw_detail().clone()],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use spark_rpc_contract::{StatusDetail, Subscript, VIOLATIONS_TYPE_URL, Violation};

    #[test]
    fn renders_every_subscript_kind() {
        let path = vec![
            FieldPathElement::field("items").with_subscript(Subscript::Index(2)),
            FieldPathElement::field("flags").with_subscript(Subscript::BoolKey(false)),
            FieldPathElement::field("labels").with_subscript(Subscript::StringKey("env".into())),
            FieldPathElement::field("offsets").with_subscript(Subscript::IntKey(-1)),
            FieldPathElement::field("shards").with_subscript(Subscript::UintKey(9)),
            FieldPathElement::field("sku"),
        ];
        assert_eq!(
            format_field_path(&path),
            "items[2].flags[false].labels[env].offsets[-1].shards[9].sku"
        );
        assert_eq!(format_field_path(&[]), "");
    }

    #[test]
    fn status_summarises_first_violation_and_keeps_full_detail() {
        let detail = StatusDetail::new(VIOLATIONS_TYPE_URL, Bytes::from_static(b"\x0a\x04full"));
        let failure = ValidationFailure::new(
            vec![
                Violation::new(
                    vec![
                        FieldPathElement::field("items").with_subscript(Subscript::Index(0)),
                        FieldPathElement::field("sku"),
                    ],
                    "value is required",
                ),
                Violation::new(vec![FieldPathElement::field("note")], "too long"),
            ],
            detail.clone(),
        )
        .expect("non-empty");

        let status = violation_status(Part::Request, &failure);
        assert_eq!(status.code(), Code::InvalidArgument);
        assert_eq!(status.message(), "invalid request: items[0].sku: value is required");
        assert_eq!(status.details(), [detail.clone()]);

        let status = violation_status(Part::Reply, &failure);
        assert_eq!(status.code(), Code::Internal);
        assert_eq!(status.message(), "invalid reply: items[0].sku: value is required");
        assert_eq!(status.details(), [detail]);
    }
}
