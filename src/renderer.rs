//! macroquad backend.
//!
//! [`MacroquadAtlasSink`] mirrors every font atlas as a `Texture2D`;
//! [`MacroquadRenderer`] draws [`DrawCommand`]s as meshes with those
//! textures, scissored to each command's clip rect.

use std::cell::RefCell;
use std::rc::Rc;

use macroquad::prelude::*;
use rustc_hash::FxHashMap;

use crate::atlas::Atlas;
use crate::builder::Builder;
use crate::font_manager::AtlasSink;
use crate::id::AtlasId;
use crate::render_commands::DrawCommand;

type TextureMap = Rc<RefCell<FxHashMap<AtlasId, Texture2D>>>;

/// Expands atlas pixels to RGBA8.
///
/// Single-channel atlases become white with the coverage (or distance) in
/// alpha. LCD atlases keep their three subpixel channels, with the
/// strongest one as alpha.
fn atlas_rgba(atlas: &Atlas) -> Vec<u8> {
    let data = atlas.data();
    match atlas.bytes_per_pixel() {
        3 => data
            .chunks_exact(3)
            .flat_map(|px| [px[0], px[1], px[2], px[0].max(px[1]).max(px[2])])
            .collect(),
        _ => data.iter().flat_map(|&c| [255, 255, 255, c]).collect(),
    }
}

fn upload(atlas: &Atlas) -> Texture2D {
    let texture = Texture2D::from_rgba8(
        atlas.width() as u16,
        atlas.height() as u16,
        &atlas_rgba(atlas),
    );
    texture.set_filter(FilterMode::Linear);
    texture
}

/// Atlas sink that keeps one macroquad texture per atlas.
#[derive(Clone, Default)]
pub struct MacroquadAtlasSink {
    textures: TextureMap,
}

impl MacroquadAtlasSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A renderer that binds this sink's textures.
    pub fn renderer(&self) -> MacroquadRenderer {
        MacroquadRenderer {
            textures: self.textures.clone(),
        }
    }
}

impl AtlasSink for MacroquadAtlasSink {
    fn create_texture(&mut self, atlas: &Atlas) {
        self.textures.borrow_mut().insert(atlas.id(), upload(atlas));
    }

    fn update_texture(&mut self, atlas: &Atlas) {
        let mut textures = self.textures.borrow_mut();
        if !textures.contains_key(&atlas.id()) {
            warn!("Atlas {:?} updated before it was created", atlas.id());
        }
        textures.insert(atlas.id(), upload(atlas));
    }

    fn destroy_texture(&mut self, atlas: AtlasId) {
        if self.textures.borrow_mut().remove(&atlas).is_none() {
            warn!("Atlas {:?} destroyed twice or never created", atlas);
        }
    }
}

pub struct MacroquadRenderer {
    textures: TextureMap,
}

impl MacroquadRenderer {
    /// Draws one command with macroquad's current camera.
    pub fn draw(&self, command: &DrawCommand<'_>) {
        let texture = match command.atlas {
            Some(id) => {
                let texture = self.textures.borrow().get(&id).cloned();
                if texture.is_none() {
                    warn!("No texture for atlas {:?}, skipping {} indices", id, command.indices.len());
                    return;
                }
                texture
            }
            None => None,
        };

        let vertices = command
            .vertices
            .iter()
            .map(|v| Vertex {
                position: Vec3::new(v.position[0], v.position[1], 0.0),
                uv: Vec2::new(v.uv[0], v.uv[1]),
                color: v.color.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8),
                normal: Vec4::new(0.0, 0.0, 1.0, 0.0),
            })
            .collect();
        let mesh = Mesh {
            vertices,
            indices: command.indices.to_vec(),
            texture,
        };

        let clip = command.clip;
        unsafe {
            get_internal_gl().quad_gl.scissor(Some((
                clip.x as i32,
                clip.y as i32,
                clip.width as i32,
                clip.height as i32,
            )));
        }
        draw_mesh(&mesh);
        unsafe {
            get_internal_gl().quad_gl.scissor(None);
        }
    }

    /// Draws every pending command of `builder` in draw order.
    pub fn draw_builder(&self, builder: &Builder) {
        for command in builder.draw_commands() {
            self.draw(&command);
        }
    }

    /// Makes [`Builder::flush`] draw through this renderer.
    pub fn attach(self, builder: &mut Builder) {
        builder.set_on_draw(Some(Box::new(move |command: &DrawCommand<'_>| {
            self.draw(command)
        })));
    }
}
