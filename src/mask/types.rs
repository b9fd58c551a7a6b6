//! Mask snapshots and undo records.

use serde::{Deserialize, Serialize};

use super::error::MaskStoreError;
use crate::constants::{DEFAULT_RESTORE_IOU_SCORE, RESTORE_PROMPT_COUNT};
use crate::model::ImageId;

/// One closed ring of `[x, y]` image coordinates.
pub type Ring = Vec<[f64; 2]>;

/// Polygon as returned by the server: a single ring or several rings (outer
/// boundary followed by holes).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Polygon {
    Single(Ring),
    Multi(Vec<Ring>),
}

impl Polygon {
    /// Multi-ring form. Saves always use this shape.
    pub fn to_rings(&self) -> Vec<Ring> {
        match self {
            Polygon::Single(ring) => vec![ring.clone()],
            Polygon::Multi(rings) => rings.clone(),
        }
    }

    pub fn into_rings(self) -> Vec<Ring> {
        match self {
            Polygon::Single(ring) => vec![ring],
            Polygon::Multi(rings) => rings,
        }
    }
}

/// Snapshot of the segmentation mask of one image.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FovMaskState {
    pub has_mask: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polygon: Option<Polygon>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iou_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_pixels: Option<u64>,
}

impl FovMaskState {
    /// State of an image without a mask.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Decode a `GET mask` response body.
    pub fn from_json(json: &str) -> Result<Self, MaskStoreError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Rings of the mask, normalized to multi-ring form.
    pub fn rings(&self) -> Option<Vec<Ring>> {
        self.polygon.as_ref().map(Polygon::to_rings)
    }
}

/// Body of a `PUT mask` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveMaskRequest {
    pub polygons: Vec<Ring>,
    pub iou_score: f64,
    pub prompt_count: u32,
}

impl SaveMaskRequest {
    pub fn new(polygon: Polygon, iou_score: f64, prompt_count: u32) -> Self {
        Self {
            polygons: polygon.into_rings(),
            iou_score,
            prompt_count,
        }
    }

    /// Request that re-creates a captured mask. `None` when there is nothing to restore.
    pub fn restoring(state: &FovMaskState) -> Option<Self> {
        if !state.has_mask {
            return None;
        }
        let polygons = state.rings()?;
        Some(Self {
            polygons,
            iou_score: state.iou_score.unwrap_or(DEFAULT_RESTORE_IOU_SCORE),
            prompt_count: RESTORE_PROMPT_COUNT,
        })
    }
}

/// Which mutation an undo record reverses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskUndoKind {
    Save,
    Delete,
}

/// A reversible mask mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskUndoAction {
    pub kind: MaskUndoKind,
    pub image_id: ImageId,
    /// Mask state captured before the mutation
    pub previous_state: FovMaskState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polygon_shapes_decode() {
        let single: FovMaskState =
            FovMaskState::from_json(r#"{"has_mask":true,"polygon":[[0,0],[4,0],[4,4]]}"#).unwrap();
        assert_eq!(single.rings().unwrap().len(), 1);

        let multi: FovMaskState = FovMaskState::from_json(
            r#"{"has_mask":true,"polygon":[[[0,0],[9,0],[9,9]],[[1,1],[2,1],[2,2]]],"iou_score":0.8}"#,
        )
        .unwrap();
        assert_eq!(multi.rings().unwrap().len(), 2);
        assert_eq!(multi.iou_score, Some(0.8));
    }

    #[test]
    fn test_missing_fields_mean_no_mask() {
        let state = FovMaskState::from_json(r#"{"has_mask":false}"#).unwrap();
        assert_eq!(state, FovMaskState::empty());
        assert!(matches!(
            FovMaskState::from_json("{"),
            Err(MaskStoreError::Decode(_))
        ));
    }

    #[test]
    fn test_restoring_applies_defaults() {
        let state = FovMaskState {
            has_mask: true,
            polygon: Some(Polygon::Single(vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]])),
            iou_score: None,
            area_pixels: Some(1),
        };
        let request = SaveMaskRequest::restoring(&state).unwrap();
        assert_eq!(request.polygons.len(), 1);
        assert_eq!(request.iou_score, DEFAULT_RESTORE_IOU_SCORE);
        assert_eq!(request.prompt_count, 1);

        assert!(SaveMaskRequest::restoring(&FovMaskState::empty()).is_none());
    }

    #[test]
    fn test_save_request_wire_shape() {
        let request = SaveMaskRequest::new(
            Polygon::Single(vec![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]),
            0.75,
            3,
        );
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["polygons"][0][1][0], 3.0);
        assert_eq!(json["prompt_count"], 3);
    }
}
