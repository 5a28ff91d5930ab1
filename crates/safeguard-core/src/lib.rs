//! safeguard-core — Face-region matching for a single enrolled subject.
//!
//! A probe image is compared with the enrolled photo by locating the first
//! (or largest) detected face in each, normalizing both to a 200×200
//! grayscale patch, scoring them with either an LBPH template classifier or
//! raw mean squared pixel error, and thresholding the distance.

pub mod cascade;
pub mod decision;
pub mod detector;
pub mod error;
pub mod lbph;
pub mod locator;
pub mod matcher;
pub mod raster;
pub mod scorer;
pub mod scrfd;
pub mod types;

pub use decision::{decide, Decision, LBPH_THRESHOLD, PIXEL_ERROR_THRESHOLD};
pub use detector::{DetectorBackend, DetectorError, FaceDetector};
pub use error::{ImageRole, MatchError};
pub use locator::{FaceLocator, SelectionPolicy};
pub use matcher::{FaceMatcher, Outcome, Verdict};
pub use raster::{ChannelOrder, ColorRaster};
pub use scorer::ScoringStrategy;
pub use types::{FaceRegion, Patch, PATCH_SIZE};
