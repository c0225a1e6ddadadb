//! Web mercator level lookup for templated mapfiles

use std::path::PathBuf;

use crate::constants::WEBMERCATOR_HALF_EXTENT;
use crate::constants::WEBMERCATOR_LEVEL_PLACEHOLDER;
use crate::constants::WEBMERCATOR_NUM_LEVELS;
use crate::constants::WEBMERCATOR_SRS;
use crate::constants::WEBMERCATOR_TILE_SIZE;
use crate::MapQuery;
use crate::RenderError;
use crate::Result;

/// Resolution (units per pixel) of `level` on the global EPSG:3857 grid
pub fn webmercator_resolution(level: u8) -> f64 {
    let level_zero = 2.0 * WEBMERCATOR_HALF_EXTENT / f64::from(WEBMERCATOR_TILE_SIZE);
    level_zero / 2f64.powi(i32::from(level))
}

/// Grid level whose resolution is closest to the query resolution
pub fn webmercator_level(query: &MapQuery) -> Result<u8> {
    if !query.srs.eq_ignore_ascii_case(WEBMERCATOR_SRS) {
        return Err(RenderError::UnsupportedSrs(query.srs.clone()).into());
    }

    let width = query.size.0.max(1);
    let resolution = query.bbox.width().abs() / f64::from(width);

    let level = (0..WEBMERCATOR_NUM_LEVELS)
        .min_by(|a, b| {
            let da = (webmercator_resolution(*a) - resolution).abs();
            let db = (webmercator_resolution(*b) - resolution).abs();
            da.total_cmp(&db)
        })
        .unwrap_or(0);
    Ok(level)
}

pub fn is_templated(mapfile: &str) -> bool {
    mapfile.contains(WEBMERCATOR_LEVEL_PLACEHOLDER)
}

/// Substitutes every `%(webmercator_level)` placeholder with `level`.
///
/// A printf style conversion after the placeholder is honored: `s`, `d` and
/// `i`, optionally with a width such as `02d`.
pub fn expand_level_template(
    template: &str,
    level: u8,
) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find(WEBMERCATOR_LEVEL_PLACEHOLDER) {
        out.push_str(&rest[..pos]);
        rest = &rest[pos + WEBMERCATOR_LEVEL_PLACEHOLDER.len()..];

        let digits = rest
            .char_indices()
            .find(|(_, c)| !c.is_ascii_digit())
            .map_or(rest.len(), |(i, _)| i);
        let (width_spec, after) = rest.split_at(digits);

        match after.chars().next() {
            Some(conversion @ ('s' | 'd' | 'i')) => {
                let width: usize = width_spec.parse().unwrap_or(0);
                if conversion != 's' && width_spec.starts_with('0') {
                    out.push_str(&format!("{level:0width$}"));
                } else {
                    out.push_str(&format!("{level:>width$}"));
                }
                rest = &after[1..];
            }
            _ => out.push_str(&level.to_string()),
        }
    }
    out.push_str(rest);
    out
}

/// Mapfile path for `query`, resolving the level placeholder if present
pub fn resolve_mapfile(
    mapfile: &str,
    query: &MapQuery,
) -> Result<PathBuf> {
    if !is_templated(mapfile) {
        return Ok(PathBuf::from(mapfile));
    }
    let level = webmercator_level(query)?;
    Ok(PathBuf::from(expand_level_template(mapfile, level)))
}
