//! Compile-time backend selection.
//!
//! `cuda` wins over `wgpu`, and `ndarray` is used when neither is enabled.

use cfg_if::cfg_if;

cfg_if! {
    if #[cfg(feature = "cuda")] {
        use burn::backend::cuda::{Cuda, CudaDevice};

        /// Backend the evaluation runs on
        pub type SelectedBackend = Cuda;
        /// Device of [`SelectedBackend`]
        pub type SelectedDevice = CudaDevice;

        /// Default device of the selected backend
        pub fn create_device() -> SelectedDevice {
            CudaDevice::default()
        }

        /// Human-readable backend name for the startup log
        pub const fn get_backend_name() -> &'static str {
            "CUDA (NVIDIA GPU)"
        }
    } else if #[cfg(feature = "wgpu")] {
        use burn::backend::wgpu::{Wgpu, WgpuDevice};

        /// Backend the evaluation runs on
        pub type SelectedBackend = Wgpu;
        /// Device of [`SelectedBackend`]
        pub type SelectedDevice = WgpuDevice;

        /// Default device of the selected backend
        pub fn create_device() -> SelectedDevice {
            WgpuDevice::default()
        }

        /// Human-readable backend name for the startup log
        pub const fn get_backend_name() -> &'static str {
            "WGPU (GPU)"
        }
    } else {
        use burn::backend::ndarray::{NdArray, NdArrayDevice};

        /// Backend the evaluation runs on
        pub type SelectedBackend = NdArray;
        /// Device of [`SelectedBackend`]
        pub type SelectedDevice = NdArrayDevice;

        /// Default device of the selected backend
        pub fn create_device() -> SelectedDevice {
            NdArrayDevice::default()
        }

        /// Human-readable backend name for the startup log
        pub const fn get_backend_name() -> &'static str {
            "NdArray (CPU)"
        }
    }
}
