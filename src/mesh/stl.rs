use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::{Mesh, Triangle};
use crate::error::ExportError;

/// Write triangles to a binary STL file
pub fn write_stl<'a>(
    path: &Path,
    triangles: impl ExactSizeIterator<Item = &'a Triangle>,
) -> Result<(), ExportError> {
    let file = File::create(path).map_err(|e| ExportError::io(path, e))?;
    let mut writer = BufWriter::new(file);

    let faces = triangles.map(|tri| stl_io::Triangle {
        normal: stl_io::Normal::new(tri.normal),
        vertices: tri.vertices.map(stl_io::Vertex::new),
    });
    stl_io::write_stl(&mut writer, faces).map_err(|e| ExportError::io(path, e))?;
    writer.flush().map_err(|e| ExportError::io(path, e))?;

    Ok(())
}

/// Write `<stem>.stl` with every volume, plus `<stem>_<volume>.stl` per
/// volume when `split_volumes` is set. Returns the written paths.
pub fn write_mesh(
    dir: &Path,
    stem: &str,
    mesh: &Mesh,
    split_volumes: bool,
) -> Result<Vec<PathBuf>, ExportError> {
    let combined: Vec<&Triangle> = mesh.triangles().collect();
    let path = dir.join(format!("{}.stl", stem));
    write_stl(&path, combined.into_iter())?;
    let mut written = vec![path];

    if split_volumes {
        for volume in &mesh.volumes {
            let path = dir.join(format!("{}_{}.stl", stem, volume.name));
            write_stl(&path, volume.triangles.iter())?;
            written.push(path);
        }
    }

    Ok(written)
}

/// File size of a binary STL with the given number of triangles
pub fn estimate_stl_size(triangle_count: usize) -> usize {
    // 80 (header) + 4 (count) + triangles * (12 normal + 36 vertices + 2 attribute)
    80 + 4 + triangle_count * 50
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{Rgb, Volume, extrude_polygon};
    use std::fs;
    use tempfile::tempdir;

    fn prism(z_bottom: f32, z_top: f32) -> Vec<Triangle> {
        let square = vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)];
        extrude_polygon(&square, &[], z_bottom, z_top)
    }

    #[test]
    fn test_write_stl() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.stl");
        let triangles = prism(0.0, 1.0);

        write_stl(&path, triangles.iter()).unwrap();

        let metadata = fs::metadata(&path).unwrap();
        assert_eq!(metadata.len(), estimate_stl_size(triangles.len()) as u64);

        let mut file = File::open(&path).unwrap();
        let read = stl_io::read_stl(&mut file).unwrap();
        assert_eq!(read.faces.len(), triangles.len());
        // A closed prism over a square has 8 distinct corners
        assert_eq!(read.vertices.len(), 8);
    }

    #[test]
    fn test_write_mesh_split_volumes() {
        let dir = tempdir().unwrap();
        let mesh = Mesh {
            volumes: vec![
                Volume::new("base", Rgb(90, 90, 90), prism(0.0, 1.0)),
                Volume::new("band_01", Rgb(0, 128, 0), prism(1.0, 2.0)),
            ],
        };

        let written = write_mesh(dir.path(), "hex_000", &mesh, true).unwrap();

        let names: Vec<String> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec!["hex_000.stl", "hex_000_base.stl", "hex_000_band_01.stl"]
        );
        assert_eq!(
            fs::metadata(&written[0]).unwrap().len(),
            estimate_stl_size(24) as u64
        );
    }

    #[test]
    fn test_write_into_missing_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("x.stl");
        let err = write_stl(&path, prism(0.0, 1.0).iter()).unwrap_err();
        assert!(matches!(err, ExportError::Io { .. }));
    }

    #[test]
    fn test_estimate_size() {
        assert_eq!(estimate_stl_size(0), 84);
        assert_eq!(estimate_stl_size(1), 134);
    }
}
