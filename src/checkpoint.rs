use std::{collections::HashMap, fs, path::Path, sync::Arc};

use log::info;
use parameter_server::{ParameterLayout, ParameterSet, ShapeMismatchErr, Snapshot};
use safetensors::{Dtype, SafeTensors, tensor::TensorView};

use crate::error::CheckpointErr;

const STEP_KEY: &str = "step";

type Result<T> = std::result::Result<T, CheckpointErr>;

/// Parameters restored from disk along with the store step they were saved at.
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint {
    pub step: u64,
    pub params: ParameterSet,
}

/// Writes a snapshot as a safetensors file, one tensor per parameter.
///
/// # Arguments
/// * `path` - Where to write the file, it's overwritten if present.
/// * `snapshot` - The parameters to save, its version is stored as the `step` metadata.
pub fn save(path: &Path, snapshot: &Snapshot) -> Result<()> {
    let views = snapshot
        .params()
        .iter()
        .map(|(name, tensor)| {
            let bytes: &[u8] = bytemuck::cast_slice(tensor.data());
            let view = TensorView::new(Dtype::F32, tensor.shape().to_vec(), bytes)?;
            Ok((name.to_string(), view))
        })
        .collect::<Result<Vec<_>>>()?;

    let metadata = HashMap::from([(STEP_KEY.to_string(), snapshot.version().to_string())]);
    let views = views.iter().map(|(name, view)| (name.as_str(), view));
    safetensors::serialize_to_file(views, &Some(metadata), path)?;

    info!(
        "saved checkpoint to {} at step {}",
        path.display(),
        snapshot.version()
    );
    Ok(())
}

/// Reads a checkpoint written by `save`.
///
/// # Arguments
/// * `path` - The safetensors file.
/// * `layout` - The layout the stored tensors must match.
///
/// # Returns
/// The restored parameters or a `CheckpointErr` if the file is unreadable or doesn't fit.
pub fn load(path: &Path, layout: Arc<ParameterLayout>) -> Result<Checkpoint> {
    let bytes = fs::read(path)?;
    let (_, metadata) = SafeTensors::read_metadata(&bytes)?;
    let tensors = SafeTensors::deserialize(&bytes)?;

    let step = metadata
        .metadata()
        .as_ref()
        .and_then(|meta| meta.get(STEP_KEY))
        .and_then(|step| step.parse().ok())
        .ok_or(CheckpointErr::Step)?;

    let buffers = layout
        .iter()
        .map(|spec| {
            let view = tensors.tensor(spec.name())?;

            if view.dtype() != Dtype::F32 {
                return Err(CheckpointErr::DType {
                    name: spec.name().to_string(),
                });
            }

            if view.shape() != spec.shape() {
                return Err(ShapeMismatchErr::Tensor {
                    name: spec.name().to_string(),
                    expected: spec.shape().to_vec(),
                    got: view.shape().to_vec(),
                }
                .into());
            }

            Ok(bytemuck::pod_collect_to_vec::<u8, f32>(view.data()))
        })
        .collect::<Result<Vec<_>>>()?;

    let params = ParameterSet::from_buffers(layout, buffers)?;
    Ok(Checkpoint { step, params })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> Arc<ParameterLayout> {
        Arc::new(ParameterLayout::default().with("w", [2, 2]).with("b", [2]))
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.safetensors");

        let params =
            ParameterSet::from_buffers(layout(), vec![vec![1., 2., 3., 4.], vec![-1., 0.5]])
                .unwrap();
        save(&path, &Snapshot::new(42, params.clone())).unwrap();

        let checkpoint = load(&path, layout()).unwrap();
        assert_eq!(checkpoint.step, 42);
        assert_eq!(checkpoint.params, params);
    }

    #[test]
    fn load_rejects_other_layouts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.safetensors");
        save(&path, &Snapshot::new(1, ParameterSet::zeros(layout()))).unwrap();

        let other = Arc::new(ParameterLayout::default().with("w", [4]).with("b", [2]));
        assert!(matches!(load(&path, other), Err(CheckpointErr::Shape(_))));

        let missing = Arc::new(ParameterLayout::default().with("v", [2]));
        assert!(matches!(load(&path, missing), Err(CheckpointErr::Format(_))));
    }
}
