//! Message templates and their immutable revisions.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entity::BridgeTypeName;

macro_rules! template_types {
    ($($variant:ident => $text:literal),* $(,)?) => {
        /// Purpose of a template.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum TemplateType {
            $(
                #[doc = concat!("`", $text, "`")]
                #[serde(rename = $text)]
                $variant,
            )*
        }

        impl TemplateType {
            /// Every template type.
            pub const ALL: &'static [Self] = &[$(Self::$variant),*];

            /// Column representation.
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)*
                }
            }
        }
    };
}

template_types! {
    EmailAccountExists => "email_account_exists",
    EmailAppInstallLink => "email_app_install_link",
    EmailResetPassword => "email_reset_password",
    EmailSignIn => "email_sign_in",
    EmailSignedConsent => "email_signed_consent",
    EmailVerifyEmail => "email_verify_email",
    SmsAccountExists => "sms_account_exists",
    SmsAppInstallLink => "sms_app_install_link",
    SmsPhoneSignIn => "sms_phone_sign_in",
    SmsResetPassword => "sms_reset_password",
    SmsSignedConsent => "sms_signed_consent",
    SmsVerifyPhone => "sms_verify_phone",
}

impl fmt::Display for TemplateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown template type text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown template type: {0}")]
pub struct UnknownTemplateType(pub String);

impl FromStr for TemplateType {
    type Err = UnknownTemplateType;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == text)
            .ok_or_else(|| UnknownTemplateType(text.to_owned()))
    }
}

/// A message template whose content lives in its revisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", rename = "Template")]
pub struct Template {
    /// Template guid.
    pub guid: String,
    /// Owning app.
    pub app_id: String,
    /// Purpose.
    pub template_type: TemplateType,
    /// Display name.
    pub name: String,
    /// Description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Creation time of the published revision.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_created_on: Option<DateTime<Utc>>,
    /// Soft-delete flag.
    pub deleted: bool,
    /// Creation time.
    pub created_on: DateTime<Utc>,
    /// Last modification time.
    pub modified_on: DateTime<Utc>,
    /// Optimistic-lock version.
    pub version: i64,
}

impl BridgeTypeName for Template {
    const TYPE_NAME: &'static str = "Template";
}

/// Content type of a template revision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MimeType {
    /// HTML.
    #[default]
    #[serde(rename = "text/html")]
    Html,
    /// Plain text.
    #[serde(rename = "text/plain")]
    Text,
    /// PDF.
    #[serde(rename = "application/pdf")]
    Pdf,
}

/// Immutable content revision of a template, keyed by
/// `(template_guid, created_on)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", rename = "TemplateRevision")]
pub struct TemplateRevision {
    /// Owning template.
    pub template_guid: String,
    /// Revision timestamp.
    pub created_on: DateTime<Utc>,
    /// Author account id.
    pub created_by: String,
    /// Storage location of the content.
    pub storage_path: String,
    /// Subject line for email templates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_content: Option<String>,
    /// Content type.
    pub mime_type: MimeType,
}

impl BridgeTypeName for TemplateRevision {
    const TYPE_NAME: &'static str = "TemplateRevision";
}

impl TemplateRevision {
    /// Storage path derived from the template guid and revision time.
    pub fn storage_path_for(template_guid: &str, created_on: DateTime<Utc>) -> String {
        format!("{template_guid}.{}", created_on.timestamp_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn template_types_round_trip_through_column_text() {
        for kind in TemplateType::ALL {
            assert_eq!(kind.as_str().parse::<TemplateType>(), Ok(*kind));
        }
    }

    #[rstest]
    fn mime_types_use_media_type_names() {
        let json = serde_json::to_value(MimeType::Pdf).expect("serializable");
        assert_eq!(json, "application/pdf");
    }

    #[rstest]
    fn storage_path_uses_epoch_millis() {
        let created_on = DateTime::from_timestamp_millis(1_460_542_200_000).expect("valid instant");
        assert_eq!(
            TemplateRevision::storage_path_for("guid", created_on),
            "guid.1460542200000"
        );
    }
}
