use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use isoterra_chunk::Chunk;

/// Writes the meshes of `chunks` as one Wavefront OBJ, one group per chunk.
/// Returns the number of triangles written.
pub fn write_obj<'a>(path: &Path, chunks: impl Iterator<Item = &'a Chunk>) -> io::Result<usize> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "# isoterra chunk dump")?;
    let mut base = 1usize;
    let mut triangles = 0usize;
    for chunk in chunks {
        let Some(mesh) = chunk.mesh() else {
            continue;
        };
        let b = &mesh.build;
        let c = chunk.coord;
        writeln!(out, "g chunk_{}_{}_{}", c.cx, c.cy, c.cz)?;
        for v in &b.vertices {
            writeln!(out, "v {} {} {}", v.position.x, v.position.y, v.position.z)?;
        }
        for v in &b.vertices {
            writeln!(out, "vn {} {} {}", v.normal.x, v.normal.y, v.normal.z)?;
        }
        for tri in b.indices.chunks_exact(3) {
            let [i, j, k] = [tri[0], tri[1], tri[2]].map(|i| base + i as usize);
            writeln!(out, "f {i}//{i} {j}//{j} {k}//{k}")?;
        }
        base += b.vertices.len();
        triangles += b.triangle_count();
    }
    out.flush()?;
    Ok(triangles)
}
