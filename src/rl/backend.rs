//! Backend type aliases and device management
//!
//! Training runs on an autodiff-enabled NdArray backend (CPU); evaluation
//! loads checkpoints onto the plain NdArray backend so no gradient state is
//! ever allocated there. The feature vectors and two-layer networks in this
//! crate are small enough that a GPU backend would not pay off.

use burn::backend::{
    Autodiff,
    ndarray::{NdArray, NdArrayDevice},
};

/// Backend used for training (gradient tracking enabled)
pub type TrainingBackend = Autodiff<NdArray<f32>>;

/// Backend used for evaluation rollouts (no gradient tracking)
pub type InferenceBackend = NdArray<f32>;

/// Default computation device (CPU)
pub fn default_device() -> NdArrayDevice {
    NdArrayDevice::default()
}
