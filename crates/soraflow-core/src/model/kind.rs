//! リソース種別カタログ
//!
//! 各種別が実体化後に生成する出力の一覧。参照が「その種別が生成すると
//! 定義された出力」を指しているかのバリデーションに使う。

const KIND_OUTPUTS: &[(&str, &[&str])] = &[
    ("service-account", &["email", "unique_id", "name"]),
    ("secret", &["secret_id", "name"]),
    ("storage-bucket", &["name", "url", "self_link"]),
    ("storage-object", &["name", "md5hash", "media_link"]),
    ("pubsub-topic", &["id", "name"]),
    ("cloud-function", &["name", "uri", "state"]),
    ("scheduler-job", &["id", "name"]),
];

/// 種別が生成する出力の一覧を返す（未知の種別は None）
pub fn produced_outputs(kind: &str) -> Option<&'static [&'static str]> {
    KIND_OUTPUTS
        .iter()
        .find(|(k, _)| *k == kind)
        .map(|(_, outputs)| *outputs)
}

/// 種別が指定の出力を生成するか
pub fn produces(kind: &str, output: &str) -> bool {
    produced_outputs(kind).is_some_and(|outputs| outputs.contains(&output))
}
