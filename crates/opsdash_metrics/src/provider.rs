use opsdash_contract::StorageProvider;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
pub enum ProviderClass {
    #[serde(rename = "AWS S3")]
    AwsS3,
    #[serde(rename = "Azure Blob")]
    AzureBlob,
    #[serde(rename = "Google Cloud")]
    GoogleCloud,
    Unknown,
}

impl ProviderClass {
    pub const ALL: [ProviderClass; 4] = [
        ProviderClass::AwsS3,
        ProviderClass::AzureBlob,
        ProviderClass::GoogleCloud,
        ProviderClass::Unknown,
    ];
}

impl From<StorageProvider> for ProviderClass {
    fn from(provider: StorageProvider) -> Self {
        match provider {
            StorageProvider::Aws => ProviderClass::AwsS3,
            StorageProvider::Azure => ProviderClass::AzureBlob,
            StorageProvider::Gcp => ProviderClass::GoogleCloud,
        }
    }
}

/// Classifies a storage location by its URI scheme prefix.
pub fn classify_provider(location: &str) -> ProviderClass {
    StorageProvider::ALL
        .into_iter()
        .find(|provider| {
            location
                .strip_prefix(provider.scheme())
                .is_some_and(|rest| rest.starts_with("://"))
        })
        .map(ProviderClass::from)
        .unwrap_or(ProviderClass::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_schemes_are_classified() {
        assert_eq!(
            classify_provider("s3://ocellaris-backups/full/2025-10-24-001.tar.gz"),
            ProviderClass::AwsS3
        );
        assert_eq!(
            classify_provider("azure://ocellaris-backups/x.tar.xz"),
            ProviderClass::AzureBlob
        );
        assert_eq!(classify_provider("gcp://bucket/x"), ProviderClass::GoogleCloud);
    }

    #[test]
    fn anything_else_is_unknown() {
        assert_eq!(classify_provider(""), ProviderClass::Unknown);
        assert_eq!(classify_provider("file:///tmp/x"), ProviderClass::Unknown);
        assert_eq!(classify_provider("s3:/missing-slash"), ProviderClass::Unknown);
        assert_eq!(classify_provider("S3://upper"), ProviderClass::Unknown);
    }

    #[test]
    fn classes_serialize_as_dashboard_names() {
        let names = serde_json::to_value(ProviderClass::ALL).expect("json");
        assert_eq!(
            names,
            serde_json::json!(["AWS S3", "Azure Blob", "Google Cloud", "Unknown"])
        );
    }
}
