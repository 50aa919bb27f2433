//! SPIR-V shader modules.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use ash::vk;

use crate::error::{GpuError, Result};

/// SPIR-V magic number, first word of every module.
pub const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Owned `VkShaderModule`.
pub struct ShaderModule {
    device: Arc<ash::Device>,
    handle: vk::ShaderModule,
}

impl ShaderModule {
    /// Create a module from SPIR-V words.
    pub fn from_spirv(device: Arc<ash::Device>, code: &[u32]) -> Result<Self> {
        if code.first() != Some(&SPIRV_MAGIC) {
            return Err(GpuError::ShaderLoad("missing SPIR-V magic number".into()));
        }

        let create_info = vk::ShaderModuleCreateInfo::default().code(code);
        // SAFETY: the code starts with a SPIR-V header; the driver validates the rest.
        let handle = unsafe { device.create_shader_module(&create_info, None) }
            .map_err(|e| GpuError::ShaderLoad(e.to_string()))?;

        Ok(Self { device, handle })
    }

    /// Load a compiled `.spv` file.
    pub fn load(device: Arc<ash::Device>, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let code = read_spirv(path)?;
        tracing::debug!(path = %path.display(), words = code.len(), "Loaded shader");
        Self::from_spirv(device, &code)
    }

    /// Raw module handle.
    pub fn handle(&self) -> vk::ShaderModule {
        self.handle
    }
}

impl Drop for ShaderModule {
    fn drop(&mut self) {
        // SAFETY: pipelines do not keep references to their shader modules.
        unsafe { self.device.destroy_shader_module(self.handle, None) };
    }
}

/// Read and realign a SPIR-V file into 32-bit words.
pub fn read_spirv(path: &Path) -> Result<Vec<u32>> {
    let mut file =
        File::open(path).map_err(|e| GpuError::ShaderLoad(format!("{}: {e}", path.display())))?;
    ash::util::read_spv(&mut file)
        .map_err(|e| GpuError::ShaderLoad(format!("{}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_a_shader_error() {
        let err = read_spirv(Path::new("./does/not/exist.spv")).unwrap_err();
        match err {
            GpuError::ShaderLoad(msg) => assert!(msg.contains("exist.spv")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn reads_words_from_disk() {
        let path = std::env::temp_dir().join(format!("hearth-shader-{}.spv", std::process::id()));
        let words = [SPIRV_MAGIC, 0x0001_0000, 0, 1, 0];
        let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        std::fs::write(&path, bytes).unwrap();

        let code = read_spirv(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(code, words);
    }

    #[test]
    fn misaligned_file_is_rejected() {
        let path = std::env::temp_dir().join(format!("hearth-bad-{}.spv", std::process::id()));
        std::fs::write(&path, [0x03, 0x02, 0x23]).unwrap();

        let result = read_spirv(&path);
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(result, Err(GpuError::ShaderLoad(_))));
    }
}
