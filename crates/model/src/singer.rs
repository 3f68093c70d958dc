use crate::error::{ErrorKind, Result};
use crate::record::{NamesMap, require_english, validate_id};
use serde::{Deserialize, Serialize};

/// A singing voice, as authored in the singer shard files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Singer {
    /// Globally unique lowercase hyphenated id.
    pub id: String,
    /// Display names by language code; must contain `en`.
    pub names: NamesMap,
    /// Who owns the voice (rights holders).
    pub owners: Vec<String>,
    /// Who produced the voicebank.
    pub authors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image_url: Option<String>,
    /// Released voicebanks for this singer; at least one.
    pub variants: Vec<SingerVariant>,
}

/// One released voicebank of a singer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingerVariant {
    /// Prefixed by the parent singer id plus a hyphen (`alice-cv`).
    pub id: String,
    pub names: NamesMap,
    /// Direct download of the voicebank archive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    /// Human download page, for voicebanks gated behind a site.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_page_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl Singer {
    pub fn validate(&self) -> Result<()> {
        validate_id(&self.id)?;
        require_english(&self.id, &self.names)?;
        if self.variants.is_empty() {
            exn::bail!(ErrorKind::NoVariants(self.id.clone()));
        }
        for variant in &self.variants {
            variant.validate(&self.id)?;
        }
        Ok(())
    }
}

impl SingerVariant {
    fn validate(&self, parent: &str) -> Result<()> {
        validate_id(&self.id)?;
        // Ids are `[a-z0-9-]+`, so the only possible separator is a hyphen.
        let prefix_len = parent.len() + 1;
        if !(self.id.starts_with(parent) && self.id[parent.len()..].starts_with('-') && self.id.len() > prefix_len)
        {
            exn::bail!(ErrorKind::UnprefixedChild {
                parent: parent.to_string(),
                child: self.id.clone(),
            });
        }
        if self.file_url.is_none() && self.download_page_url.is_none() {
            exn::bail!(ErrorKind::NoDistribution(self.id.clone()));
        }
        Ok(())
    }
}
