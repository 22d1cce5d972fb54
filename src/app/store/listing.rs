//! Parsing of Azure "List Blobs" responses
//!
//! A hierarchical listing (`delimiter=/`) returns `<Blob>` entries for objects
//! directly under the prefix and `<BlobPrefix>` entries for virtual
//! sub-directories, plus a `<NextMarker>` continuation token when the result
//! was paged.
//!
//! ```text
//! <EnumerationResults ContainerName="data">
//!   <Prefix>train/</Prefix>
//!   <Blobs>
//!     <Blob><Name>train/a.tif</Name><Properties>...</Properties></Blob>
//!     <BlobPrefix><Name>train/labels/</Name></BlobPrefix>
//!   </Blobs>
//!   <NextMarker />
//! </EnumerationResults>
//! ```
//!
//! The html5ever parser behind `scraper` lower-cases element names, so the
//! selectors below are lower-case.

use scraper::{ElementRef, Html, Selector};

use crate::errors::{EnumerationError, EnumerationResult};

/// One page of a hierarchical blob listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    /// Full names of blobs directly under the prefix
    pub blobs: Vec<String>,
    /// Full names of virtual directories, with trailing `/`
    pub prefixes: Vec<String>,
    /// Continuation token, `None` on the last page
    pub next_marker: Option<String>,
}

impl ListingPage {
    /// Parse a List Blobs response body
    pub fn parse(body: &str) -> EnumerationResult<Self> {
        let document = Html::parse_document(body);

        let root = selector("enumerationresults")?;
        if document.select(&root).next().is_none() {
            return Err(EnumerationError::InvalidListing {
                reason: "response has no EnumerationResults element".to_string(),
            });
        }

        let blob_names = selector("blobs blob > name")?;
        let prefix_names = selector("blobs blobprefix > name")?;
        let next_marker = selector("nextmarker")?;

        let blobs = document
            .select(&blob_names)
            .map(element_text)
            .filter(|name| !name.is_empty())
            .collect();

        let prefixes = document
            .select(&prefix_names)
            .map(element_text)
            .filter(|name| !name.is_empty())
            .collect();

        let next_marker = document
            .select(&next_marker)
            .next()
            .map(element_text)
            .filter(|marker| !marker.is_empty());

        Ok(Self {
            blobs,
            prefixes,
            next_marker,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty() && self.prefixes.is_empty()
    }
}

fn selector(css: &str) -> EnumerationResult<Selector> {
    Selector::parse(css).map_err(|e| EnumerationError::InvalidListing {
        reason: format!("invalid selector '{}': {}", css, e),
    })
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
