use std::path::PathBuf;

use super::*;
use crate::constants::WEBMERCATOR_HALF_EXTENT;
use crate::Error;
use crate::RenderError;

fn tile_query(level: i32) -> MapQuery {
    let span = 2.0 * WEBMERCATOR_HALF_EXTENT / 2f64.powi(level);
    MapQuery {
        bbox: BBox::new(0.0, 0.0, span, span),
        size: (256, 256),
        srs: "EPSG:3857".to_string(),
        format: "image/png".to_string(),
    }
}

#[test]
fn level_zero_resolution_covers_the_world_in_one_tile() {
    let resolution = webmercator_resolution(0);
    assert!((resolution - 156_543.033_928_041).abs() < 1e-6);
    assert!((webmercator_resolution(1) - resolution / 2.0).abs() < 1e-9);
}

#[test]
fn level_matches_tile_queries() {
    assert_eq!(webmercator_level(&tile_query(0)).unwrap(), 0);
    assert_eq!(webmercator_level(&tile_query(5)).unwrap(), 5);
    assert_eq!(webmercator_level(&tile_query(17)).unwrap(), 17);
}

#[test]
fn level_picks_the_closest_resolution() {
    let mut query = tile_query(5);
    // Slightly larger than a level-5 tile
    query.size = (240, 240);
    assert_eq!(webmercator_level(&query).unwrap(), 5);
}

#[test]
fn level_accepts_lowercase_srs() {
    let mut query = tile_query(3);
    query.srs = "epsg:3857".to_string();
    assert_eq!(webmercator_level(&query).unwrap(), 3);
}

#[test]
fn level_rejects_other_projections() {
    let mut query = tile_query(3);
    query.srs = "EPSG:4326".to_string();

    match webmercator_level(&query) {
        Err(Error::Render(RenderError::UnsupportedSrs(srs))) => assert_eq!(srs, "EPSG:4326"),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn template_conversions_are_expanded() {
    assert_eq!(
        expand_level_template("/maps/z%(webmercator_level)s.xml", 5),
        "/maps/z5.xml"
    );
    assert_eq!(
        expand_level_template("/maps/z%(webmercator_level)02d.xml", 5),
        "/maps/z05.xml"
    );
    assert_eq!(
        expand_level_template("/maps/z%(webmercator_level)d/%(webmercator_level)i.xml", 12),
        "/maps/z12/12.xml"
    );
}

#[test]
fn template_without_conversion_inserts_the_level() {
    assert_eq!(expand_level_template("/maps/%(webmercator_level)/osm.xml", 7), "/maps/7/osm.xml");
}

#[test]
fn plain_mapfiles_ignore_the_query_projection() {
    let mut query = tile_query(3);
    query.srs = "EPSG:4326".to_string();

    assert!(!is_templated("/maps/osm.xml"));
    assert_eq!(
        resolve_mapfile("/maps/osm.xml", &query).unwrap(),
        PathBuf::from("/maps/osm.xml")
    );
}

#[test]
fn templated_mapfiles_resolve_per_level() {
    let template = "/maps/osm_%(webmercator_level)s.xml";
    assert!(is_templated(template));
    assert_eq!(
        resolve_mapfile(template, &tile_query(4)).unwrap(),
        PathBuf::from("/maps/osm_4.xml")
    );
}
