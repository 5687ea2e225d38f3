use thiserror::Error;

/// 文本元数据集合，保持插入顺序并允许同名键出现多次。
///
/// 键在写入时统一转为小写；只接受 `[0-9a-z-_.]` 字符，`grpc-` 前缀保留给传输层，
/// `-bin` 后缀需要二进制值，本集合不承载。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Metadata {
    entries: Vec<(String, String)>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个键值对，不影响同名的已有条目。
    pub fn append(&mut self, key: &str, value: &str) -> Result<(), MetadataError> {
        let key = normalize_key(key)?;
        validate_value(&key, value)?;
        self.entries.push((key, value.to_owned()));
        Ok(())
    }

    /// 写入键值对并移除同名的已有条目。
    pub fn insert(&mut self, key: &str, value: &str) -> Result<(), MetadataError> {
        let key = normalize_key(key)?;
        validate_value(&key, value)?;
        self.entries.retain(|(existing, _)| *existing != key);
        self.entries.push((key, value.to_owned()));
        Ok(())
    }

    /// 返回首个匹配值；查询键大小写不敏感。
    pub fn get(&self, key: &str) -> Option<&str> {
        self.get_all(key).next()
    }

    pub fn get_all<'a>(&'a self, key: &str) -> impl Iterator<Item = &'a str> + use<'a> {
        let key = key.to_ascii_lowercase();
        self.entries
            .iter()
            .filter(move |(existing, _)| *existing == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 元数据写入被拒绝的原因。
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum MetadataError {
    #[error("invalid metadata key `{key}`: {reason}")]
    InvalidKey { key: String, reason: &'static str },

    #[error("invalid value for metadata key `{key}`: only printable ASCII is allowed")]
    InvalidValue { key: String },

    #[error("response headers already sent, cannot attach `{key}`")]
    HeadersSent { key: String },
}

impl MetadataError {
    /// 稳定错误码，便于日志检索与告警聚合。
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidKey { .. } => "spark.rpc.metadata.invalid_key",
            Self::InvalidValue { .. } => "spark.rpc.metadata.invalid_value",
            Self::HeadersSent { .. } => "spark.rpc.metadata.headers_sent",
        }
    }
}

pub(crate) fn normalize_key(key: &str) -> Result<String, MetadataError> {
    let invalid = |reason| MetadataError::InvalidKey {
        key: key.to_owned(),
        reason,
    };
    if key.is_empty() {
        return Err(invalid("key is empty"));
    }
    let key_lower = key.to_ascii_lowercase();
    if !key_lower
        .bytes()
        .all(|b| b.is_ascii_digit() || b.is_ascii_lowercase() || matches!(b, b'-' | b'_' | b'.'))
    {
        return Err(invalid("only [0-9a-z-_.] are allowed"));
    }
    if key_lower.starts_with("grpc-") {
        return Err(invalid("the `grpc-` prefix is reserved"));
    }
    if key_lower.ends_with("-bin") {
        return Err(invalid("binary metadata is not supported"));
    }
    Ok(key_lower)
}

fn validate_value(key: &str, value: &str) -> Result<(), MetadataError> {
    if value.bytes().all(|b| (0x20..=0x7e).contains(&b)) {
        Ok(())
    } else {
        Err(MetadataError::InvalidValue {
            key: key.to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_lowercased_and_lookup_is_case_insensitive() {
        let mut md = Metadata::new();
        md.append("X-Version", "1.4.2").expect("append");
        assert_eq!(md.iter().next(), Some(("x-version", "1.4.2")));
        assert_eq!(md.get("X-VERSION"), Some("1.4.2"));
    }

    #[test]
    fn append_keeps_duplicates_insert_replaces() {
        let mut md = Metadata::new();
        md.append("trace", "a").expect("append a");
        md.append("trace", "b").expect("append b");
        assert_eq!(md.get_all("trace").collect::<Vec<_>>(), ["a", "b"]);

        md.insert("trace", "c").expect("insert");
        assert_eq!(md.get_all("trace").collect::<Vec<_>>(), ["c"]);
        assert_eq!(md.len(), 1);
    }

    #[test]
    fn rejects_reserved_and_malformed_keys() {
        let mut md = Metadata::new();
        for key in ["", "grpc-status", "has space", "blob-bin", "ünï"] {
            let err = md.append(key, "v").expect_err(key);
            assert_eq!(err.code(), "spark.rpc.metadata.invalid_key");
        }
        assert!(md.is_empty());
    }

    #[test]
    fn rejects_non_printable_values() {
        let mut md = Metadata::new();
        let err = md.append("x-version", "1.0\n").expect_err("newline");
        assert_eq!(
            err,
            MetadataError::InvalidValue {
                key: "x-version".to_owned()
            }
        );
    }
}
