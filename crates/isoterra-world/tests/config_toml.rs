use isoterra_world::{ConfigError, SolverKind, TerrainConfig};

#[test]
fn partial_toml_fills_defaults() {
    let cfg = TerrainConfig::from_toml_str(
        r#"
        [streaming]
        chunk_size = 16
        max_active_chunks = 64
        max_loaded_chunks = 128

        [mesher]
        solver = "batched"
        centroid_bias = 0.2
        "#,
    )
    .unwrap();
    assert_eq!(cfg.streaming.chunk_size, 16);
    assert_eq!(cfg.streaming.max_active_chunks, 64);
    assert_eq!(cfg.mesher.solver, SolverKind::Batched);
    assert!((cfg.mesher.centroid_bias - 0.2).abs() < 1e-6);
    assert_eq!(cfg.mesher.solve_iterations, 10);
    assert!((cfg.lighting.sky_brightness - 5.0).abs() < 1e-6);
}

#[test]
fn empty_toml_is_default() {
    let cfg = TerrainConfig::from_toml_str("").unwrap();
    assert_eq!(cfg.streaming.chunk_size, 24);
    assert_eq!(cfg.streaming.max_active_chunks, 1536);
}

#[test]
fn active_cap_above_resident_cap_is_rejected() {
    let err = TerrainConfig::from_toml_str(
        r#"
        [streaming]
        max_active_chunks = 10
        max_loaded_chunks = 5
        "#,
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn oversized_vertex_cap_is_rejected() {
    let err = TerrainConfig::from_toml_str("[mesher]\nmax_chunk_verts = 70000\n").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn vertex_cap_leaves_the_invalid_index_free() {
    // Index u16::MAX marks "no vertex", so at most u16::MAX vertices fit.
    let err = TerrainConfig::from_toml_str("[mesher]\nmax_chunk_verts = 65536\n").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
    let cfg = TerrainConfig::from_toml_str("[mesher]\nmax_chunk_verts = 65535\n").unwrap();
    assert_eq!(cfg.mesher.max_chunk_verts, u32::from(u16::MAX));
}

#[test]
fn equal_active_and_loaded_caps_are_accepted() {
    let cfg = TerrainConfig::from_toml_str(
        "[streaming]\nmax_active_chunks = 4\nmax_loaded_chunks = 4\n",
    )
    .unwrap();
    assert_eq!(cfg.streaming.max_active_chunks, cfg.streaming.max_loaded_chunks);
}

#[test]
fn malformed_toml_reports_parse_error() {
    let err = TerrainConfig::from_toml_str("[streaming\nchunk_size = ").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}
