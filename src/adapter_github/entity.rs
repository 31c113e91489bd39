#[derive(Debug, serde::Deserialize)]
pub struct Asset {
    pub name: String,
    pub browser_download_url: String,
}

impl From<Asset> for crate::domain::entity::Asset {
    fn from(value: Asset) -> Self {
        Self {
            name: value.name,
            download_url: value.browser_download_url,
        }
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

impl From<Release> for crate::domain::entity::Release {
    fn from(value: Release) -> Self {
        Self {
            tag_name: value.tag_name,
            assets: value.assets.into_iter().map(Into::into).collect(),
        }
    }
}

/// Which release of the repository to fetch.
#[derive(Clone, Copy, Debug)]
pub enum ReleaseSelector<'a> {
    Latest,
    Tag(&'a str),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Repository {
    pub owner: String,
    pub name: String,
}

impl Repository {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid repository {0:?}, expected \"owner/name\"")]
pub struct InvalidRepository(String);

impl std::str::FromStr for Repository {
    type Err = InvalidRepository;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().split_once('/') {
            Some((owner, name))
                if !owner.is_empty() && !name.is_empty() && !name.contains('/') =>
            {
                Ok(Self::new(owner, name))
            }
            _ => Err(InvalidRepository(value.to_string())),
        }
    }
}
