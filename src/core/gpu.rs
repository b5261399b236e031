//! GPU texture infrastructure.
//!
//! This module provides the recording context and texture handles that
//! GPU-backed special images refer into. Texture descriptors use wgpu's
//! format, usage and sampler types. Texel contents are kept in a
//! device-resident mirror so that shaders can be evaluated without a
//! readback; reading pixels back to the CPU goes through
//! [`GpuTexture::read_pixels`] and requires `COPY_SRC` usage.

use crate::core::bitmap::Bitmap;
use crate::core::color::{AlphaType, Color, ColorInfo, ColorType, ImageInfo};
use crate::core::error::GpuError;
use crate::core::geometry::{IRect, ISize, Matrix};
use crate::core::ids::next_unique_id;
use crate::core::image::Image;
use crate::core::shader::{FilterMode, SamplingOptions, Shader, TexelSampler, TileMode};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Default texture budget per context (256 MB).
pub const DEFAULT_TEXTURE_BUDGET: usize = 256 * 1024 * 1024;

/// How a context submits work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextKind {
    /// Commands go straight to the device.
    Immediate,
    /// Commands are recorded and submitted later.
    Deferred,
}

/// Owner of GPU textures.
///
/// Opaque to special images: they only store and return it.
pub struct RecordingContext {
    id: u32,
    kind: ContextKind,
    backend: wgpu::Backend,
    budget: usize,
    allocated: AtomicUsize,
}

impl RecordingContext {
    /// Create a context with the default budget.
    pub fn new(kind: ContextKind) -> Arc<Self> {
        Self::with_budget(kind, DEFAULT_TEXTURE_BUDGET)
    }

    /// Create a context limited to `budget` bytes of textures.
    pub fn with_budget(kind: ContextKind, budget: usize) -> Arc<Self> {
        let backend = Self::detect_backend();
        log::debug!("Creating {:?} recording context on {:?}", kind, backend);
        Arc::new(Self {
            id: next_unique_id(),
            kind,
            backend,
            budget,
            allocated: AtomicUsize::new(0),
        })
    }

    /// Pick the platform's native backend.
    fn detect_backend() -> wgpu::Backend {
        #[cfg(target_os = "linux")]
        return wgpu::Backend::Vulkan;

        #[cfg(any(target_os = "macos", target_os = "ios"))]
        return wgpu::Backend::Metal;

        #[cfg(target_os = "windows")]
        return wgpu::Backend::Dx12;

        #[cfg(not(any(
            target_os = "linux",
            target_os = "macos",
            target_os = "ios",
            target_os = "windows"
        )))]
        return wgpu::Backend::Gl;
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn kind(&self) -> ContextKind {
        self.kind
    }

    pub fn backend(&self) -> wgpu::Backend {
        self.backend
    }

    /// Bytes currently held by live textures.
    pub fn allocated_bytes(&self) -> usize {
        self.allocated.load(Ordering::Acquire)
    }

    /// Allocate a zeroed texture.
    pub fn create_texture(
        self: &Arc<Self>,
        size: ISize,
        format: wgpu::TextureFormat,
        usage: wgpu::TextureUsages,
    ) -> Result<Arc<GpuTexture>, GpuError> {
        let color_type = color_type_for_format(format)
            .ok_or_else(|| GpuError::UnsupportedFormat(format!("{:?}", format)))?;
        let info = ImageInfo::new(size, ColorInfo::new(color_type, AlphaType::Premul, None));
        let bytes = info.compute_byte_size(info.min_row_bytes());
        let texels = Bitmap::try_alloc(info).map_err(|_| GpuError::OutOfMemory { bytes })?;
        self.wrap_texels(texels, format, usage)
    }

    /// Upload a copy of `bitmap` into a new texture of matching format.
    pub fn upload(
        self: &Arc<Self>,
        bitmap: &Bitmap,
        usage: wgpu::TextureUsages,
    ) -> Result<Arc<GpuTexture>, GpuError> {
        let format = format_for_color_type(bitmap.color_type())
            .ok_or_else(|| GpuError::UnsupportedFormat(format!("{:?}", bitmap.color_type())))?;
        let texels = bitmap
            .copy_to(bitmap.color_type())
            .map_err(|_| GpuError::OutOfMemory {
                bytes: bitmap.compute_byte_size(),
            })?;
        self.wrap_texels(texels, format, usage | wgpu::TextureUsages::COPY_DST)
    }

    fn wrap_texels(
        self: &Arc<Self>,
        texels: Bitmap,
        format: wgpu::TextureFormat,
        usage: wgpu::TextureUsages,
    ) -> Result<Arc<GpuTexture>, GpuError> {
        let bytes = texels.storage_byte_size();
        self.reserve(bytes)?;
        let size = texels.dimensions();
        log::debug!(
            "Created {}x{} {:?} texture ({} bytes)",
            size.width,
            size.height,
            format,
            bytes
        );
        Ok(Arc::new(GpuTexture {
            id: next_unique_id(),
            format,
            usage,
            texels,
            bytes,
            context: Arc::clone(self),
        }))
    }

    fn reserve(&self, bytes: usize) -> Result<(), GpuError> {
        let mut current = self.allocated.load(Ordering::Acquire);
        loop {
            if current + bytes > self.budget {
                return Err(GpuError::OutOfMemory { bytes });
            }
            match self.allocated.compare_exchange_weak(
                current,
                current + bytes,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(()),
                Err(actual) => current = actual,
            }
        }
    }

    fn release(&self, bytes: usize) {
        self.allocated.fetch_sub(bytes, Ordering::AcqRel);
    }
}

impl fmt::Debug for RecordingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingContext")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("backend", &self.backend)
            .field("allocated", &self.allocated_bytes())
            .finish()
    }
}

/// A GPU texture. Its memory is returned to the context when dropped.
pub struct GpuTexture {
    id: u32,
    format: wgpu::TextureFormat,
    usage: wgpu::TextureUsages,
    texels: Bitmap,
    bytes: usize,
    context: Arc<RecordingContext>,
}

impl GpuTexture {
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    pub fn usage(&self) -> wgpu::TextureUsages {
        self.usage
    }

    pub fn dimensions(&self) -> ISize {
        self.texels.dimensions()
    }

    pub fn bounds(&self) -> IRect {
        self.texels.bounds()
    }

    /// Device memory held by the texture.
    pub fn byte_size(&self) -> usize {
        self.bytes
    }

    pub fn context(&self) -> &Arc<RecordingContext> {
        &self.context
    }

    /// True if pixels can be copied back to the CPU.
    pub fn is_readable(&self) -> bool {
        self.usage.contains(wgpu::TextureUsages::COPY_SRC)
    }

    pub(crate) fn texels(&self) -> &Bitmap {
        &self.texels
    }

    /// Copy `region` back into a new CPU bitmap. Blocks until complete.
    pub fn read_pixels(&self, region: &IRect) -> Result<Bitmap, GpuError> {
        if !self.is_readable() {
            return Err(GpuError::ReadbackUnsupported(format!("{:?}", self.format)));
        }
        if !self.bounds().contains(region) {
            return Err(GpuError::InvalidRegion {
                region: *region,
                bounds: self.bounds(),
            });
        }
        log::debug!("Reading back {} from texture {}", region, self.id);
        self.texels
            .extract_subset(region)
            .and_then(|view| view.copy_to(view.color_type()).ok())
            .ok_or(GpuError::OutOfMemory {
                bytes: region.size().area() as usize * self.texels.info().bytes_per_pixel(),
            })
    }
}

impl Drop for GpuTexture {
    fn drop(&mut self) {
        self.context.release(self.bytes);
        log::trace!("Released texture {} ({} bytes)", self.id, self.bytes);
    }
}

impl fmt::Debug for GpuTexture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpuTexture")
            .field("id", &self.id)
            .field("format", &self.format)
            .field("usage", &self.usage)
            .field("dimensions", &self.dimensions())
            .field("context", &self.context.id)
            .finish()
    }
}

/// Texture format storing pixels of `color_type`.
pub fn format_for_color_type(color_type: ColorType) -> Option<wgpu::TextureFormat> {
    match color_type {
        ColorType::Rgba8888 => Some(wgpu::TextureFormat::Rgba8Unorm),
        ColorType::Bgra8888 => Some(wgpu::TextureFormat::Bgra8Unorm),
        ColorType::Gray8 | ColorType::Alpha8 => Some(wgpu::TextureFormat::R8Unorm),
        ColorType::Unknown => None,
    }
}

/// Pixel layout of a texture format, if it has a CPU equivalent.
pub fn color_type_for_format(format: wgpu::TextureFormat) -> Option<ColorType> {
    match format {
        wgpu::TextureFormat::Rgba8Unorm | wgpu::TextureFormat::Rgba8UnormSrgb => {
            Some(ColorType::Rgba8888)
        }
        wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Bgra8UnormSrgb => {
            Some(ColorType::Bgra8888)
        }
        wgpu::TextureFormat::R8Unorm => Some(ColorType::Gray8),
        _ => None,
    }
}

/// Sampler address mode equivalent to a tile mode.
pub fn address_mode_for(tile_mode: TileMode) -> wgpu::AddressMode {
    match tile_mode {
        TileMode::Clamp => wgpu::AddressMode::ClampToEdge,
        TileMode::Repeat => wgpu::AddressMode::Repeat,
        TileMode::Mirror => wgpu::AddressMode::MirrorRepeat,
        TileMode::Decal => wgpu::AddressMode::ClampToBorder,
    }
}

/// Tile mode equivalent to a sampler address mode.
pub fn tile_mode_for(address_mode: wgpu::AddressMode) -> TileMode {
    match address_mode {
        wgpu::AddressMode::ClampToEdge => TileMode::Clamp,
        wgpu::AddressMode::Repeat => TileMode::Repeat,
        wgpu::AddressMode::MirrorRepeat => TileMode::Mirror,
        wgpu::AddressMode::ClampToBorder => TileMode::Decal,
    }
}

fn filter_mode_for(filter: FilterMode) -> wgpu::FilterMode {
    match filter {
        FilterMode::Nearest => wgpu::FilterMode::Nearest,
        FilterMode::Linear => wgpu::FilterMode::Linear,
    }
}

/// Native shader over a texture-backed image.
///
/// Sampling state is described by a wgpu sampler descriptor. When strict,
/// texture coordinates are clamped to the subset before the address mode
/// applies, the way a subset-aware fragment shader would.
pub struct TextureShader {
    image: Arc<Image>,
    sampler: TexelSampler,
    address_modes: [wgpu::AddressMode; 2],
    filter: wgpu::FilterMode,
    inverse: Matrix,
    strict: bool,
}

impl TextureShader {
    /// Build a shader over `image`, restricted to `subset` when given.
    pub fn make(
        image: Arc<Image>,
        subset: Option<IRect>,
        tile_mode: TileMode,
        sampling: SamplingOptions,
        local_matrix: &Matrix,
    ) -> Option<Arc<TextureShader>> {
        if !image.is_texture_backed() {
            return None;
        }
        let inverse = local_matrix.invert()?;
        let texels = image.texels();
        let domain = match subset {
            Some(subset) if image.bounds().contains(&subset) => subset,
            Some(_) => return None,
            None => texels.storage_bounds(),
        };
        let address_mode = address_mode_for(tile_mode);
        Some(Arc::new(TextureShader {
            sampler: TexelSampler {
                texels,
                domain,
                tile_x: tile_mode_for(address_mode),
                tile_y: tile_mode_for(address_mode),
                filter: sampling.filter,
            },
            image,
            address_modes: [address_mode, address_mode],
            filter: filter_mode_for(sampling.filter),
            inverse,
            strict: subset.is_some(),
        }))
    }

    /// Descriptor a device sampler would be created from.
    pub fn sampler_descriptor(&self) -> wgpu::SamplerDescriptor<'static> {
        wgpu::SamplerDescriptor {
            label: Some("special-image"),
            address_mode_u: self.address_modes[0],
            address_mode_v: self.address_modes[1],
            mag_filter: self.filter,
            min_filter: self.filter,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        }
    }
}

impl fmt::Debug for TextureShader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextureShader")
            .field("image", &self.image.unique_id())
            .field("domain", &self.sampler.domain)
            .field("address_modes", &self.address_modes)
            .field("filter", &self.filter)
            .field("strict", &self.strict)
            .finish()
    }
}

impl Shader for TextureShader {
    fn sample(&self, x: f32, y: f32) -> Color {
        let (u, v) = self.inverse.map_point(x, y);
        self.sampler.sample(u, v)
    }

    fn strict_subset(&self) -> Option<IRect> {
        self.strict.then_some(self.sampler.domain)
    }
}
