//! Features detected in an application.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Every feature recorded for an application, in pipeline order.
pub const ALL_FEATURES: [Feature; 5] = [
    Feature::Internet,
    Feature::AccountManager,
    Feature::UseSsl,
    Feature::Sharing,
    Feature::Internationalization,
];

/// A feature an application may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Feature {
    /// Network access.
    Internet,
    /// Access to the device accounts.
    AccountManager,
    /// Secure connections.
    UseSsl,
    /// Sharing content with other applications.
    Sharing,
    /// Localized resources.
    Internationalization,
}

impl Feature {
    /// Key of the feature in the stored vector.
    pub fn key(self) -> &'static str {
        match self {
            Feature::Internet => "Internet",
            Feature::AccountManager => "AccountManager",
            Feature::UseSsl => "UseSSL",
            Feature::Sharing => "Sharing",
            Feature::Internationalization => "Internationalization",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Boolean vector with one entry per feature.
///
/// Every key is always present; a feature that was not checked is `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureVector {
    #[serde(rename = "Internet")]
    internet: bool,
    #[serde(rename = "AccountManager")]
    account_manager: bool,
    #[serde(rename = "UseSSL")]
    use_ssl: bool,
    #[serde(rename = "Sharing")]
    sharing: bool,
    #[serde(rename = "Internationalization")]
    internationalization: bool,
}

impl FeatureVector {
    /// Gets the value of a feature.
    pub fn get(&self, feature: Feature) -> bool {
        match feature {
            Feature::Internet => self.internet,
            Feature::AccountManager => self.account_manager,
            Feature::UseSsl => self.use_ssl,
            Feature::Sharing => self.sharing,
            Feature::Internationalization => self.internationalization,
        }
    }

    /// Sets the value of a feature.
    pub fn set(&mut self, feature: Feature, value: bool) {
        let slot = match feature {
            Feature::Internet => &mut self.internet,
            Feature::AccountManager => &mut self.account_manager,
            Feature::UseSsl => &mut self.use_ssl,
            Feature::Sharing => &mut self.sharing,
            Feature::Internationalization => &mut self.internationalization,
        };
        *slot = value;
    }

    /// Iterates over every feature and its value, in pipeline order.
    pub fn iter(&self) -> impl Iterator<Item = (Feature, bool)> + '_ {
        ALL_FEATURES.iter().map(move |&f| (f, self.get(f)))
    }
}

impl fmt::Display for FeatureVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (feature, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", feature, value)?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::{Feature, FeatureVector, ALL_FEATURES};

    #[test]
    fn it_feature_vector_keys() {
        let mut features = FeatureVector::default();
        features.set(Feature::UseSsl, true);

        let json = serde_json::to_value(&features).unwrap();
        let object = json.as_object().unwrap();
        assert_eq!(object.len(), 5);
        for feature in &ALL_FEATURES {
            assert!(object.contains_key(feature.key()));
        }
        assert_eq!(object["UseSSL"], true);
        assert_eq!(object["Internet"], false);
    }

    #[test]
    fn it_feature_vector_get_set() {
        let mut features = FeatureVector::default();
        assert!(features.iter().all(|(_, v)| !v));

        features.set(Feature::Sharing, true);
        features.set(Feature::Internationalization, true);
        assert!(features.get(Feature::Sharing));
        assert!(features.get(Feature::Internationalization));
        assert!(!features.get(Feature::Internet));

        assert_eq!(
            format!("{}", features),
            "{Internet: false, AccountManager: false, UseSSL: false, Sharing: true, \
             Internationalization: true}"
        );
    }

    #[test]
    fn it_rejects_incomplete_vectors() {
        assert!(serde_json::from_str::<FeatureVector>(r#"{"Internet": true}"#).is_err());
    }
}
