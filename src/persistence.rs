//! Delimited-text persistence for the offline matrices.
//!
//! Each artifact is one plain comma-delimited numeric file, one matrix row
//! per line. Loading parses the whole file, validates the shape against the
//! configured dimensions, and only then hands the matrix over: a corrupt or
//! mismatched artifact is rejected whole, never partially applied.

use std::fs;
use std::path::Path;

use nalgebra::DMatrix;

use crate::engine::errors::PersistenceError;

/// File name of the persisted transition matrix.
pub const TRANSITION_FILE: &str = "trans.csv";
/// File name of the persisted reward matrix.
pub const REWARD_FILE: &str = "rew.csv";
/// File name of the persisted alpha matrix.
pub const ALPHA_FILE: &str = "alpha.csv";

/// The three offline matrices as a persistable set.
#[derive(Debug, Clone)]
pub struct PolicyArtifacts {
    /// `N x N` transition model
    pub transition: DMatrix<f64>,
    /// `N x M` reward model
    pub reward: DMatrix<f64>,
    /// `N x M` alpha matrix
    pub alpha: DMatrix<f64>,
}

/// Write one matrix as comma-delimited text.
pub fn save_matrix(path: &Path, matrix: &DMatrix<f64>) -> Result<(), PersistenceError> {
    let mut out = String::new();
    for i in 0..matrix.nrows() {
        for j in 0..matrix.ncols() {
            if j > 0 {
                out.push(',');
            }
            out.push_str(&format!("{:e}", matrix[(i, j)]));
        }
        out.push('\n');
    }
    fs::write(path, out).map_err(|e| PersistenceError::Io {
        path: path.display().to_string(),
        detail: e.to_string(),
    })
}

/// Read one matrix, validating the shape before returning it.
///
/// The file must hold exactly `rows` lines of `cols` comma-delimited numeric
/// fields; anything else is a [`PersistenceError::ShapeMismatch`] or
/// [`PersistenceError::MalformedField`], and nothing is returned.
pub fn load_matrix(
    path: &Path,
    rows: usize,
    cols: usize,
    artifact: &str,
) -> Result<DMatrix<f64>, PersistenceError> {
    let text = fs::read_to_string(path).map_err(|e| PersistenceError::Io {
        path: path.display().to_string(),
        detail: e.to_string(),
    })?;

    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let actual_cols = lines
        .first()
        .map(|l| l.split(',').count())
        .unwrap_or(0);
    if lines.len() != rows || actual_cols != cols {
        return Err(PersistenceError::ShapeMismatch {
            artifact: artifact.to_string(),
            expected: (rows, cols),
            actual: (lines.len(), actual_cols),
        });
    }

    let mut values = Vec::with_capacity(rows * cols);
    for (i, line) in lines.iter().enumerate() {
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != cols {
            return Err(PersistenceError::ShapeMismatch {
                artifact: artifact.to_string(),
                expected: (rows, cols),
                actual: (lines.len(), fields.len()),
            });
        }
        for (j, field) in fields.iter().enumerate() {
            let value: f64 =
                field
                    .trim()
                    .parse()
                    .map_err(|_| PersistenceError::MalformedField {
                        path: path.display().to_string(),
                        row: i,
                        column: j,
                    })?;
            values.push(value);
        }
    }

    Ok(DMatrix::from_row_slice(rows, cols, &values))
}

/// Persist all three artifacts into a directory.
pub fn save_artifacts(dir: &Path, artifacts: &PolicyArtifacts) -> Result<(), PersistenceError> {
    fs::create_dir_all(dir).map_err(|e| PersistenceError::Io {
        path: dir.display().to_string(),
        detail: e.to_string(),
    })?;
    save_matrix(&dir.join(TRANSITION_FILE), &artifacts.transition)?;
    save_matrix(&dir.join(REWARD_FILE), &artifacts.reward)?;
    save_matrix(&dir.join(ALPHA_FILE), &artifacts.alpha)
}

/// Load all three artifacts, validating every shape against `(n, m)`.
///
/// All-or-nothing: the first failure aborts the load and the caller falls
/// back to re-solving.
pub fn load_artifacts(dir: &Path, n: usize, m: usize) -> Result<PolicyArtifacts, PersistenceError> {
    let transition = load_matrix(&dir.join(TRANSITION_FILE), n, n, "transition")?;
    let reward = load_matrix(&dir.join(REWARD_FILE), n, m, "reward")?;
    let alpha = load_matrix(&dir.join(ALPHA_FILE), n, m, "alpha")?;
    Ok(PolicyArtifacts {
        transition,
        reward,
        alpha,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join("voxel_point_filter_tests")
            .join(format!("{}_{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_matrix_round_trip() {
        let dir = scratch_dir("round_trip");
        let path = dir.join("m.csv");
        let matrix = DMatrix::from_row_slice(2, 3, &[1.0, -0.5, 3.25e-4, 0.0, 7.0, 1e12]);

        save_matrix(&path, &matrix).unwrap();
        let loaded = load_matrix(&path, 2, 3, "m").unwrap();

        for (a, b) in matrix.iter().zip(loaded.iter()) {
            assert!((a - b).abs() < 1e-12 * a.abs().max(1.0));
        }
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = scratch_dir("missing");
        let err = load_matrix(&dir.join("nope.csv"), 2, 2, "m").unwrap_err();
        assert!(matches!(err, PersistenceError::Io { .. }));
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let dir = scratch_dir("shape");
        let path = dir.join("m.csv");
        let matrix = DMatrix::from_element(3, 3, 1.0);
        save_matrix(&path, &matrix).unwrap();

        let err = load_matrix(&path, 4, 3, "m").unwrap_err();
        assert!(matches!(err, PersistenceError::ShapeMismatch { .. }));
        let err = load_matrix(&path, 3, 2, "m").unwrap_err();
        assert!(matches!(err, PersistenceError::ShapeMismatch { .. }));
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_malformed_field_rejected() {
        let dir = scratch_dir("malformed");
        let path = dir.join("m.csv");
        fs::write(&path, "1.0,2.0\n3.0,oops\n").unwrap();

        let err = load_matrix(&path, 2, 2, "m").unwrap_err();
        match err {
            PersistenceError::MalformedField { row, column, .. } => {
                assert_eq!(row, 1);
                assert_eq!(column, 1);
            }
            other => panic!("unexpected error {:?}", other),
        }
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_artifact_set_round_trip() {
        let dir = scratch_dir("artifacts");
        let artifacts = PolicyArtifacts {
            transition: DMatrix::from_element(3, 3, 1.0 / 3.0),
            reward: DMatrix::from_element(3, 2, -0.5),
            alpha: DMatrix::from_element(3, 2, 0.25),
        };
        save_artifacts(&dir, &artifacts).unwrap();

        let loaded = load_artifacts(&dir, 3, 2).unwrap();
        assert_eq!(loaded.transition.shape(), (3, 3));
        assert_eq!(loaded.reward.shape(), (3, 2));
        assert_eq!(loaded.alpha.shape(), (3, 2));

        // a wrong dimension rejects the whole set
        assert!(load_artifacts(&dir, 4, 2).is_err());
        fs::remove_dir_all(&dir).ok();
    }
}
