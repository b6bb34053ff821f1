//! Ordered color attachments plus an optional depth attachment a pipeline
//! variant renders into. Drives both the fragment stage's output-field set
//! and the render pipeline's color/depth target state.

#[derive(Debug, Clone)]
pub struct ColorTarget {
    pub name: String,
    pub format: wgpu::TextureFormat,
}

#[derive(Debug, Clone, Default)]
pub struct RenderTargetLayout {
    pub color_targets: Vec<ColorTarget>,
    pub depth_format: Option<wgpu::TextureFormat>,
}

impl RenderTargetLayout {
    pub fn find_color_target(&self, name: &str) -> Option<&ColorTarget> {
        self.color_targets.iter().find(|t| t.name == name)
    }

    pub fn depth_output_name(&self) -> Option<&'static str> {
        self.depth_format.map(|_| "depth")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn finds_a_color_target_by_name() {
        let layout = RenderTargetLayout {
            color_targets: vec![ColorTarget { name: "color".into(), format: wgpu::TextureFormat::Rgba8Unorm }],
            depth_format: Some(wgpu::TextureFormat::Depth32Float),
        };
        assert_eq!(layout.find_color_target("color").unwrap().format, wgpu::TextureFormat::Rgba8Unorm);
        assert_eq!(layout.depth_output_name(), Some("depth"));
    }
}
