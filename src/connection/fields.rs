//! 必須フィールドリゾルバー
//!
//! 接続種別（およびサブ種別）ごとの必須フィールド集合を返す純粋関数群。
//! ウィザードの段階ゲートとオーケストレーターの事前チェックが
//! 同一の関数を参照することで「完全」の定義が乖離しない。

use std::collections::HashMap;

use crate::connection::types::{ConnectionKind, FieldError, RegistryFlavor};

/// フィールド定義
///
/// `secret` が真のフィールドは検証時のみ通過し、永続化されない。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// フィールド名（設定マップのキー）
    pub name: &'static str,
    /// 表示ラベル
    pub label: &'static str,
    /// シークレット扱いか
    pub secret: bool,
}

impl FieldSpec {
    const fn plain(name: &'static str, label: &'static str) -> Self {
        Self {
            name,
            label,
            secret: false,
        }
    }

    const fn secret(name: &'static str, label: &'static str) -> Self {
        Self {
            name,
            label,
            secret: true,
        }
    }
}

/// 名前フィールド（全種別で先頭に必須）
pub const NAME_FIELD: FieldSpec = FieldSpec::plain("name", "Connection name");

/// 種別・サブ種別ごとの必須フィールドリスト
///
/// 決定的かつ副作用なし。同じ入力には常に同じ順序の同じリストを返す。
pub fn required_fields(kind: ConnectionKind, flavor: Option<RegistryFlavor>) -> Vec<FieldSpec> {
    let mut fields = vec![NAME_FIELD];
    match kind {
        ConnectionKind::SourceControl => {
            fields.push(FieldSpec::plain("owner", "Repository owner"));
            fields.push(FieldSpec::plain("repository", "Repository name"));
            fields.push(FieldSpec::secret("access_token", "Access token"));
        }
        ConnectionKind::Cluster => {
            fields.push(FieldSpec::plain("api_endpoint", "Cluster API endpoint"));
            fields.push(FieldSpec::secret("service_token", "Service account token"));
        }
        ConnectionKind::ContainerRegistry => {
            fields.push(FieldSpec::plain("registry_url", "Registry URL"));
            match flavor.unwrap_or_default() {
                RegistryFlavor::Basic => {
                    fields.push(FieldSpec::plain("username", "Username"));
                    fields.push(FieldSpec::secret("password", "Password"));
                }
                RegistryFlavor::AccessKey => {
                    fields.push(FieldSpec::plain("access_key_id", "Access key ID"));
                    fields.push(FieldSpec::secret("secret_access_key", "Secret access key"));
                }
                RegistryFlavor::ServicePrincipal => {
                    fields.push(FieldSpec::plain("tenant_id", "Tenant ID"));
                    fields.push(FieldSpec::plain("client_id", "Client ID"));
                    fields.push(FieldSpec::secret("client_secret", "Client secret"));
                }
            }
        }
        ConnectionKind::SecretsVault => {
            fields.push(FieldSpec::plain("vault_addr", "Vault address"));
            fields.push(FieldSpec::secret("vault_token", "Vault token"));
        }
        ConnectionKind::TelemetryCollector => {
            fields.push(FieldSpec::plain("endpoint", "Collector endpoint"));
            fields.push(FieldSpec::secret("api_key", "API key"));
        }
    }
    fields
}

/// 単一フィールドの定義を引く（blur 時の個別再チェック用）
pub fn field_spec(
    kind: ConnectionKind,
    flavor: Option<RegistryFlavor>,
    name: &str,
) -> Option<FieldSpec> {
    required_fields(kind, flavor)
        .into_iter()
        .find(|f| f.name == name)
}

/// 空白必須フィールドをエラー集合として返す
///
/// 空文字・空白のみは未入力扱い。ウィザードのガード遷移と
/// オーケストレーターの事前チェックの双方がこれを使う。
pub fn missing_fields(
    kind: ConnectionKind,
    flavor: Option<RegistryFlavor>,
    values: &HashMap<String, String>,
) -> Vec<FieldError> {
    required_fields(kind, flavor)
        .iter()
        .filter(|spec| is_blank(values.get(spec.name)))
        .map(|spec| FieldError::required(spec.name, spec.label))
        .collect()
}

fn is_blank(value: Option<&String>) -> bool {
    value.map(|v| v.trim().is_empty()).unwrap_or(true)
}
