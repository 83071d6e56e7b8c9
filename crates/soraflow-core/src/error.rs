use thiserror::Error;

#[derive(Error, Debug)]
pub enum StackError {
    #[error("KDLパースエラー: {0}")]
    KdlParse(#[from] kdl::KdlError),

    #[error("ファイル読み込みエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("無効な設定: {0}")]
    InvalidConfig(String),

    #[error("リソース名が重複しています: {0}")]
    DuplicateName(String),

    #[error("参照先リソースが見つかりません: {reference}（{node} から参照）")]
    DanglingReference { node: String, reference: String },

    #[error("リソース種別 '{kind}' は出力 '{output}' を生成しません（{node} から参照）")]
    UnknownOutput {
        node: String,
        kind: String,
        output: String,
    },

    #[error("循環依存が検出されました: {0}")]
    CircularDependency(String),

    #[error("無効な参照形式: {0}\nヒント: \"kind:name.output\" の形式で指定してください")]
    InvalidReference(String),
}

pub type Result<T> = std::result::Result<T, StackError>;
