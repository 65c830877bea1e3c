//! Per-tick candidate extraction and template matching.

use crate::{IdentityKey, TrackerParams};
use image::RgbImage;
use std::collections::BTreeSet;
use tablecast_core::{
    centroid_and_orientation, hue_distance, match_shapes, mean_hue_at, merge_nearby_contours,
    polygon_area, segment_foreground, Contour,
};
use tablecast_template::{to_canvas_frame, ObjectPose, ObjectTemplate, TemplateLibrary};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// One foreground blob seen this tick.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectionCandidate {
    /// Outline in the y-up canvas frame, same handedness as template contours.
    pub contour: Contour,
    pub area: f64,
    /// `None` when the centroid falls outside the canvas.
    pub hue: Option<f64>,
    pub pose: ObjectPose,
}

/// A candidate accepted by a template.
#[derive(Clone, Debug, PartialEq)]
pub struct CandidateMatch {
    pub key: IdentityKey,
    pub template_index: usize,
    pub score: f64,
    pub pose: ObjectPose,
}

/// Segment `frame` against `base` and keep merged blobs at least the given
/// fraction of the smallest template, largest first.
#[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all))]
pub fn extract_candidates(
    base: &RgbImage,
    frame: &RgbImage,
    smallest_template_area: f64,
    params: &TrackerParams,
) -> Vec<DetectionCandidate> {
    let (width, height) = frame.dimensions();
    let raw = segment_foreground(base, frame, &params.segmentation);
    let min_area = params.min_area_fraction_of_smallest_template * smallest_template_area;

    let mut sized: Vec<(f64, Contour)> = merge_nearby_contours(&raw, params.merge_distance)
        .into_iter()
        .map(|c| (polygon_area(&c), c))
        .collect();
    sized.sort_by(|a, b| b.0.total_cmp(&a.0));

    let mut out = Vec::new();
    for (area, contour) in sized {
        if area < min_area {
            // sorted by area: everything after is smaller
            break;
        }
        let canvas = to_canvas_frame(&contour, width, height);
        let (centroid, orientation_deg) = match centroid_and_orientation(&canvas) {
            Ok(v) => v,
            Err(e) => {
                log::trace!("dropping candidate: {e}");
                continue;
            }
        };
        let pose = ObjectPose {
            centroid,
            orientation_deg,
        };
        let px = pose.pixel_centroid(width, height);
        out.push(DetectionCandidate {
            contour: canvas,
            area,
            hue: mean_hue_at(frame, px.x, px.y, params.hue_sample_radius),
            pose,
        });
    }
    log::debug!("{} raw contours, {} candidates", raw.len(), out.len());
    out
}

/// `true` when the template does not check color or `hue` is close to either
/// of its fingerprints.
pub fn hue_matches(hue: Option<f64>, template: &ObjectTemplate, margin: f64) -> bool {
    if !template.check_color_match {
        return true;
    }
    match hue {
        Some(h) => {
            hue_distance(h, template.white_hue) <= margin
                || hue_distance(h, template.color_hue) <= margin
        }
        None => false,
    }
}

/// Shape distance when the candidate passes both the shape and color gates.
pub fn score_candidate(
    candidate: &DetectionCandidate,
    template: &ObjectTemplate,
    params: &TrackerParams,
) -> Option<f64> {
    let score = match_shapes(
        &candidate.contour,
        &template.canonical_contour,
        params.shape_metric,
    )
    .ok()?;
    if score >= params.shape_match_threshold {
        return None;
    }
    hue_matches(candidate.hue, template, params.hue_margin).then_some(score)
}

/// Assign each candidate to its best-scoring template that still has quota.
///
/// Candidates are taken in the given order; excess candidates are ignored. A
/// candidate landing on an identity key already claimed this tick is a
/// duplicate of that object and does not use up quota.
pub fn match_candidates(
    candidates: &[DetectionCandidate],
    templates: &TemplateLibrary,
    params: &TrackerParams,
) -> Vec<CandidateMatch> {
    let mut used = vec![0usize; templates.len()];
    let mut claimed = BTreeSet::new();
    let mut matches = Vec::new();

    for candidate in candidates {
        let best = templates
            .iter()
            .enumerate()
            .filter(|(i, _)| used[*i] < params.max_instances_per_template)
            .filter_map(|(i, t)| score_candidate(candidate, t, params).map(|s| (i, t, s)))
            .min_by(|a, b| a.2.total_cmp(&b.2));

        let Some((index, template, score)) = best else {
            continue;
        };
        let key = IdentityKey::quantize(
            candidate.pose.centroid,
            template.arc_length(),
            params.position_margin,
            params.size_margin,
        );
        if !claimed.insert(key) {
            log::trace!("candidate at {key} duplicates a claimed key");
            continue;
        }
        used[index] += 1;
        matches.push(CandidateMatch {
            key,
            template_index: index,
            score,
            pose: candidate.pose,
        });
    }
    matches
}
