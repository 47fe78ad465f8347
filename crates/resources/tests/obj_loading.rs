//! OBJ parsing and vertex deduplication through the public API.

use std::io::Cursor;
use std::path::Path;

use viewer_resources::{MeshData, ResourceError};

const QUAD: &str = "\
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 1.0 1.0 0.0
v 0.0 1.0 0.0
vn 0.0 0.0 1.0
vt 0.0 0.0
vt 1.0 0.0
vt 1.0 1.0
vt 0.0 1.0
f 1/1/1 2/2/1 3/3/1
f 1/1/1 3/3/1 4/4/1
";

fn parse(source: &str) -> Result<MeshData, ResourceError> {
    MeshData::from_obj_reader(&mut Cursor::new(source.as_bytes()), Path::new("mem.obj"))
}

#[test]
fn test_shared_corners_are_deduplicated() {
    let mesh = parse(QUAD).unwrap();

    assert_eq!(mesh.vertices.len(), 4);
    assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
    assert_eq!(mesh.vertices[1].position.x, 1.0);
    assert_eq!(mesh.vertices[2].tex_coord.y, 1.0);
    assert_eq!(mesh.vertices[0].normal.z, 1.0);
}

#[test]
fn test_quad_face_is_triangulated() {
    let source = "\
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 1.0 1.0 0.0
v 0.0 1.0 0.0
f 1 2 3 4
";
    let mesh = parse(source).unwrap();

    assert_eq!(mesh.index_count(), 6);
    assert_eq!(mesh.vertices.len(), 4);
}

#[test]
fn test_same_position_with_different_uv_is_not_merged() {
    let source = "\
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 1.0 1.0 0.0
vt 0.0 0.0
vt 1.0 0.0
vt 1.0 1.0
vt 0.5 0.5
f 1/1 2/2 3/3
f 1/4 3/3 2/2
";
    let mesh = parse(source).unwrap();

    assert_eq!(mesh.vertices.len(), 4);
    assert_eq!(mesh.indices, vec![0, 1, 2, 3, 2, 1]);
}

#[test]
fn test_file_without_faces_is_rejected() {
    let err = parse("v 0.0 0.0 0.0\n").unwrap_err();
    assert!(matches!(err, ResourceError::EmptyMesh(_)));
}

#[test]
fn test_missing_file_reports_path() {
    let err = MeshData::load_obj(Path::new("does/not/exist.obj")).unwrap_err();
    assert!(err.to_string().contains("does/not/exist.obj"));
}
