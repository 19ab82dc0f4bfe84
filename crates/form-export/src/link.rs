use form_model::BlobKey;
use thiserror::Error;
use url::Url;

const BINARY_DATA_PATH: [&str; 2] = ["view", "binaryData"];
const BLOB_KEY_PARAM: &str = "blobKey";

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("invalid base url '{url}': {source}")]
    Parse {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("base url '{url}' cannot carry a path")]
    CannotBeABase { url: String },
}

/// Builds links to binary data served next to the export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkBuilder {
    endpoint: Url,
}

impl LinkBuilder {
    pub fn new(base_url: &str) -> Result<Self, LinkError> {
        let mut endpoint = Url::parse(base_url).map_err(|source| LinkError::Parse {
            url: base_url.to_string(),
            source,
        })?;
        endpoint
            .path_segments_mut()
            .map_err(|_| LinkError::CannotBeABase {
                url: base_url.to_string(),
            })?
            .pop_if_empty()
            .extend(BINARY_DATA_PATH);
        endpoint.set_query(None);
        endpoint.set_fragment(None);
        Ok(Self { endpoint })
    }

    /// `<base>/view/binaryData?blobKey=<key>`
    pub fn binary_data_url(&self, key: &BlobKey) -> String {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair(BLOB_KEY_PARAM, key.as_str());
        url.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_endpoint_to_base_path() {
        let links = LinkBuilder::new("https://aggregate.example.org/odk/").expect("base");
        assert_eq!(
            links.binary_data_url(&BlobKey::new("uuid:1/photo")),
            "https://aggregate.example.org/odk/view/binaryData?blobKey=uuid%3A1%2Fphoto"
        );
    }

    #[test]
    fn drops_query_and_fragment_from_base() {
        let links = LinkBuilder::new("http://localhost:8080?x=1#top").expect("base");
        assert_eq!(
            links.binary_data_url(&BlobKey::new("k")),
            "http://localhost:8080/view/binaryData?blobKey=k"
        );
    }

    #[test]
    fn rejects_unusable_bases() {
        assert!(matches!(
            LinkBuilder::new("not a url"),
            Err(LinkError::Parse { .. })
        ));
        assert!(matches!(
            LinkBuilder::new("mailto:ops@example.org"),
            Err(LinkError::CannotBeABase { .. })
        ));
    }
}
