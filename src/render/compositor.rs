//! Paints an [`EditorState`] onto a [`Surface`] with `vello_cpu`.
//!
//! One frame is one `RenderContext`: background, overlay, then visible layers in ascending
//! `zIndex`. Shadows are painted to an offscreen pixmap, blurred on the CPU and drawn back as an
//! image paint beneath their layer. Observers only hear about frames whose
//! [`FrameSignature`] differs from the last one they were shown.

use std::{collections::HashMap, sync::Arc};

use vello_cpu::kurbo::Shape as _;

use crate::{
    assets::{
        cache::{ImageCache, ImageStatus},
        decode::DecodedImage,
    },
    foundation::{
        color::Color,
        core::{Affine, Point, Rect, Surface, checked_surface_dims},
        error::{CardError, CardResult},
        math::finite_or,
    },
    layout::{
        metrics::{FontSpec, LayoutInputs, TextBlock, layer_bounds, layer_transform, text_block},
        text::{ShapedLine, TextEngine},
    },
    model::{
        canvas::{BackgroundType, CanvasState, GradientState, ImageFilters},
        layer::{ImageLayer, Layer, LogoLayer, Shadow, TextAlign, TextLayer},
        state::EditorState,
    },
    render::{
        fingerprint::FrameSignature,
        raster::{
            blur_rgba8_premul, brightness_contrast_in_place, gradient_rgba8_premul,
            resize_rgba8_premul,
        },
    },
};

/// Observer of emitted frames.
pub type CanvasListener = Box<dyn FnMut(&Surface, FrameSignature)>;

#[derive(Clone, Debug, PartialEq)]
pub struct CompositorOpts {
    /// Alpha of the black loading indicator dots.
    pub loading_fill_alpha: f64,
    /// Gaussian sigma per pixel of shadow `blurRadius`.
    pub shadow_sigma_scale: f64,
}

impl Default for CompositorOpts {
    fn default() -> Self {
        Self {
            loading_fill_alpha: 0.5,
            shadow_sigma_scale: 0.5,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderOutcome {
    /// The background image is still resolving; a placeholder was painted and nothing emitted.
    Loading,
    Painted { changed: bool },
}

#[derive(Clone, Debug, PartialEq)]
struct GradientKey {
    width: u16,
    height: u16,
    gradient: GradientState,
}

#[derive(Clone, Debug, PartialEq)]
struct BackgroundKey {
    src: String,
    width: u16,
    height: u16,
    filters: [u64; 3],
}

/// Paints frames and tracks what observers have already seen.
pub struct Compositor {
    opts: CompositorOpts,
    surface: Option<Surface>,
    last_emitted: Option<FrameSignature>,
    listeners: Vec<CanvasListener>,
    gradient_cache: Option<(GradientKey, vello_cpu::Image)>,
    background_cache: Option<(BackgroundKey, vello_cpu::Image)>,
    image_paints: HashMap<String, (Arc<DecodedImage>, vello_cpu::Image)>,
}

impl std::fmt::Debug for Compositor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compositor")
            .field("opts", &self.opts)
            .field("last_emitted", &self.last_emitted)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new(CompositorOpts::default())
    }
}

/// Per-frame inputs shared by the layer painters.
struct Frame<'a> {
    width: u16,
    height: u16,
    state: &'a EditorState,
    images: &'a ImageCache,
}

struct LineDraw {
    shaped: ShapedLine,
    origin: Point,
    underline: Option<Rect>,
}

impl Compositor {
    pub fn new(opts: CompositorOpts) -> Self {
        Self {
            opts,
            surface: None,
            last_emitted: None,
            listeners: Vec::new(),
            gradient_cache: None,
            background_cache: None,
            image_paints: HashMap::new(),
        }
    }

    pub fn opts(&self) -> &CompositorOpts {
        &self.opts
    }

    /// The most recently painted frame, loading placeholders included.
    pub fn surface(&self) -> Option<&Surface> {
        self.surface.as_ref()
    }

    pub fn last_signature(&self) -> Option<FrameSignature> {
        self.last_emitted
    }

    /// Register a "canvas updated" observer.
    pub fn subscribe(&mut self, listener: CanvasListener) {
        self.listeners.push(listener);
    }

    /// Paint `state`. Degraded content (missing fonts, pending or failed images) is skipped,
    /// never an error; only an impossible canvas size fails.
    #[tracing::instrument(skip(self, state, images, text), fields(
        width = state.canvas.canvas_width,
        height = state.canvas.canvas_height,
        layers = state.layers.len(),
    ))]
    pub fn render(
        &mut self,
        state: &EditorState,
        images: &ImageCache,
        text: &mut TextEngine,
    ) -> CardResult<RenderOutcome> {
        let (width, height) =
            checked_surface_dims(state.canvas.canvas_width, state.canvas.canvas_height)?;
        let frame = Frame {
            width,
            height,
            state,
            images,
        };
        let canvas = &state.canvas;
        let mut ctx = vello_cpu::RenderContext::new(width, height);
        let full = vello_cpu::kurbo::Rect::new(0.0, 0.0, f64::from(width), f64::from(height));

        if let Some(src) = canvas.active_bg_image()
            && matches!(images.status(src), ImageStatus::Pending | ImageStatus::Absent)
        {
            self.paint_loading(&mut ctx, canvas, full);
            self.surface = Some(finish(ctx, width, height)?);
            tracing::debug!(%src, "background image pending; frame not emitted");
            return Ok(RenderOutcome::Loading);
        }

        let bg_loaded = self.paint_background(&mut ctx, &frame, full)?;
        paint_overlay(&mut ctx, canvas, full, bg_loaded);

        self.image_paints.retain(|key, _| images.get(key).is_some());

        let inputs = LayoutInputs { canvas, images };
        for layer in state.paint_order() {
            if !layer.is_visible() {
                continue;
            }
            let opacity = finite_or(layer.base().opacity, 1.0).clamp(0.0, 1.0);
            if opacity <= 0.0 {
                continue;
            }
            reset_paint_state(&mut ctx);
            if opacity < 1.0 {
                ctx.push_opacity_layer(opacity as f32);
            }
            match layer {
                Layer::Text(t) => self.paint_text(&mut ctx, &frame, layer, t, text)?,
                Layer::Logo(l) => {
                    if let Some(bounds) = layer_bounds(layer, &inputs, text) {
                        self.paint_logo(&mut ctx, &frame, layer, l, bounds);
                    }
                }
                Layer::Image(i) => {
                    if let Some(bounds) = layer_bounds(layer, &inputs, text) {
                        self.paint_image(&mut ctx, &frame, layer, i, bounds)?;
                    }
                }
            }
            if opacity < 1.0 {
                ctx.pop_layer();
            }
        }

        let surface = finish(ctx, width, height)?;
        let ready = images.ready_keys();
        let signature = FrameSignature::compute(&surface, state, &ready);
        let changed = self.last_emitted != Some(signature);
        if changed {
            self.last_emitted = Some(signature);
            for listener in &mut self.listeners {
                listener(&surface, signature);
            }
        } else {
            tracing::debug!("frame unchanged; observers not notified");
        }
        self.surface = Some(surface);
        Ok(RenderOutcome::Painted { changed })
    }

    fn paint_loading(
        &self,
        ctx: &mut vello_cpu::RenderContext,
        canvas: &CanvasState,
        full: vello_cpu::kurbo::Rect,
    ) {
        ctx.set_paint(solid(Color::parse_or(&canvas.bg_color, Color::WHITE)));
        ctx.fill_rect(&full);

        let dot = Color::BLACK.with_alpha_mul(self.opts.loading_fill_alpha);
        ctx.set_paint(solid(dot));
        let c = full.center();
        let r = (full.height().min(full.width()) / 60.0).clamp(2.0, 8.0);
        for i in -1..=1 {
            let center = vello_cpu::kurbo::Point::new(c.x + f64::from(i) * r * 3.0, c.y);
            ctx.fill_path(&vello_cpu::kurbo::Circle::new(center, r).to_path(0.1));
        }
    }

    /// Returns whether a background image was actually drawn.
    fn paint_background(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        frame: &Frame<'_>,
        full: vello_cpu::kurbo::Rect,
    ) -> CardResult<bool> {
        let canvas = &frame.state.canvas;
        let bg_color = Color::parse_or(&canvas.bg_color, Color::WHITE);
        match canvas.background_type {
            BackgroundType::Solid => {
                ctx.set_paint(solid(bg_color));
                ctx.fill_rect(&full);
                Ok(false)
            }
            BackgroundType::Gradient => {
                let paint = self.gradient_paint(frame.width, frame.height, &canvas.gradient)?;
                ctx.set_paint(paint);
                ctx.fill_rect(&full);
                Ok(false)
            }
            BackgroundType::Image => {
                let Some(src) = canvas.active_bg_image() else {
                    return Ok(false);
                };
                match frame.images.get(src) {
                    Some(img) => {
                        let paint = self.background_paint(frame, src, &img)?;
                        ctx.set_paint(paint);
                        ctx.fill_rect(&full);
                        Ok(true)
                    }
                    None => {
                        ctx.set_paint(solid(bg_color));
                        ctx.fill_rect(&full);
                        Ok(false)
                    }
                }
            }
        }
    }

    fn gradient_paint(
        &mut self,
        width: u16,
        height: u16,
        gradient: &GradientState,
    ) -> CardResult<vello_cpu::Image> {
        let key = GradientKey {
            width,
            height,
            gradient: gradient.clone(),
        };
        if let Some((cached, paint)) = &self.gradient_cache
            && *cached == key
        {
            return Ok(paint.clone());
        }
        let rgba = gradient_rgba8_premul(u32::from(width), u32::from(height), gradient)?;
        let paint = image_paint(&rgba, u32::from(width), u32::from(height))?;
        self.gradient_cache = Some((key, paint.clone()));
        Ok(paint)
    }

    fn background_paint(
        &mut self,
        frame: &Frame<'_>,
        src: &str,
        img: &DecodedImage,
    ) -> CardResult<vello_cpu::Image> {
        let filters = frame.state.canvas.bg_image_filters;
        let key = BackgroundKey {
            src: src.to_owned(),
            width: frame.width,
            height: frame.height,
            filters: [
                filters.blur.to_bits(),
                filters.brightness.to_bits(),
                filters.contrast.to_bits(),
            ],
        };
        if let Some((cached, paint)) = &self.background_cache
            && *cached == key
        {
            return Ok(paint.clone());
        }

        let (w, h) = (u32::from(frame.width), u32::from(frame.height));
        let mut rgba = resize_rgba8_premul(&img.rgba8_premul, img.width, img.height, w, h)?;
        rgba = apply_filters(rgba, w, h, &filters)?;
        let paint = image_paint(&rgba, w, h)?;
        self.background_cache = Some((key, paint.clone()));
        Ok(paint)
    }

    fn layer_image_paint(
        &mut self,
        key: &str,
        img: &Arc<DecodedImage>,
    ) -> Option<vello_cpu::Image> {
        if let Some((cached, paint)) = self.image_paints.get(key)
            && Arc::ptr_eq(cached, img)
        {
            return Some(paint.clone());
        }
        match image_paint(&img.rgba8_premul, img.width, img.height) {
            Ok(paint) => {
                self.image_paints
                    .insert(key.to_owned(), (Arc::clone(img), paint.clone()));
                Some(paint)
            }
            Err(err) => {
                tracing::warn!(%key, error = %err, "image cannot be painted");
                None
            }
        }
    }

    fn paint_text(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        frame: &Frame<'_>,
        layer: &Layer,
        t: &TextLayer,
        text: &mut TextEngine,
    ) -> CardResult<()> {
        let block = text_block(t, f64::from(frame.width), text);
        if block.lines.is_empty() {
            return Ok(());
        }
        let bounds = block.bounds();
        if !bounds.is_finite() {
            return Ok(());
        }
        let xf = layer_transform(layer, bounds);
        let lines = layout_lines(t, &block, text);
        if lines.is_empty() {
            return Ok(());
        }

        if t.text_shadow.enabled {
            let shadow = &t.text_shadow;
            let color = Color::parse_or(&shadow.color, Color::BLACK);
            let offset = shadow_offset(shadow);
            let paint = self.blurred_shadow(frame, shadow, |sctx| {
                draw_lines(sctx, &lines, offset * xf, color);
            })?;
            draw_full_canvas(ctx, paint, frame);
        }

        let color = Color::parse_or(&t.text_color, Color::BLACK);
        draw_lines(ctx, &lines, xf, color);
        Ok(())
    }

    fn paint_logo(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        frame: &Frame<'_>,
        layer: &Layer,
        logo: &LogoLayer,
        bounds: Rect,
    ) {
        let Some(src) = logo.src.as_deref() else {
            return;
        };
        let Some(img) = frame.images.get(src) else {
            return;
        };
        let Some(paint) = self.layer_image_paint(src, &img) else {
            return;
        };
        let xf = layer_transform(layer, bounds)
            * Affine::translate(bounds.origin().to_vec2())
            * Affine::scale_non_uniform(
                bounds.width() / f64::from(img.width),
                bounds.height() / f64::from(img.height),
            );
        ctx.set_transform(affine_to_cpu(xf));
        ctx.set_paint(paint);
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(img.width),
            f64::from(img.height),
        ));
    }

    fn paint_image(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        frame: &Frame<'_>,
        layer: &Layer,
        image: &ImageLayer,
        bounds: Rect,
    ) -> CardResult<()> {
        if bounds.width() <= 0.0 || bounds.height() <= 0.0 {
            return Ok(());
        }
        let Some(img) = frame.images.get(&image.src) else {
            return Ok(());
        };
        let xf = layer_transform(layer, bounds);
        let radius = finite_or(image.border_radius, 0.0)
            .clamp(0.0, bounds.width().min(bounds.height()) / 2.0);
        let path = vello_cpu::kurbo::RoundedRect::new(
            bounds.x0, bounds.y0, bounds.x1, bounds.y1, radius,
        )
        .to_path(0.1);

        if image.shadow.enabled {
            let shadow = &image.shadow;
            let color = Color::parse_or(&shadow.color, Color::BLACK);
            let offset = shadow_offset(shadow);
            let paint = self.blurred_shadow(frame, shadow, |sctx| {
                sctx.set_transform(affine_to_cpu(offset * xf));
                sctx.set_paint(solid(color));
                sctx.fill_path(&path);
            })?;
            draw_full_canvas(ctx, paint, frame);
        }

        let Some(paint) = self.layer_image_paint(&image.src, &img) else {
            return Ok(());
        };
        reset_paint_state(ctx);
        ctx.set_transform(affine_to_cpu(xf));
        ctx.set_paint_transform(affine_to_cpu(
            Affine::translate(bounds.origin().to_vec2())
                * Affine::scale_non_uniform(
                    bounds.width() / f64::from(img.width),
                    bounds.height() / f64::from(img.height),
                ),
        ));
        ctx.set_paint(paint);
        ctx.fill_path(&path);
        ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        Ok(())
    }

    /// Paint `draw` into a transparent canvas-sized pixmap and blur it by the shadow radius.
    fn blurred_shadow(
        &self,
        frame: &Frame<'_>,
        shadow: &Shadow,
        draw: impl FnOnce(&mut vello_cpu::RenderContext),
    ) -> CardResult<vello_cpu::Image> {
        let mut sctx = vello_cpu::RenderContext::new(frame.width, frame.height);
        draw(&mut sctx);
        sctx.flush();
        let mut pixmap = vello_cpu::Pixmap::new(frame.width, frame.height);
        sctx.render_to_pixmap(&mut pixmap);

        let (w, h) = (u32::from(frame.width), u32::from(frame.height));
        let sigma = finite_or(shadow.blur_radius, 0.0).max(0.0) * self.opts.shadow_sigma_scale;
        let rgba = blur_rgba8_premul(pixmap.data_as_u8_slice(), w, h, sigma as f32)?;
        image_paint(&rgba, w, h)
    }
}

fn shadow_offset(shadow: &Shadow) -> Affine {
    Affine::translate((
        finite_or(shadow.offset_x, 0.0),
        finite_or(shadow.offset_y, 0.0),
    ))
}

fn reset_paint_state(ctx: &mut vello_cpu::RenderContext) {
    ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
}

fn paint_overlay(
    ctx: &mut vello_cpu::RenderContext,
    canvas: &CanvasState,
    full: vello_cpu::kurbo::Rect,
    bg_image_loaded: bool,
) {
    let applicable = match canvas.background_type {
        BackgroundType::Gradient => true,
        BackgroundType::Image => bg_image_loaded,
        BackgroundType::Solid => false,
    };
    let opacity = finite_or(canvas.overlay.opacity, 0.0).clamp(0.0, 1.0);
    if !applicable || opacity <= 0.0 {
        return;
    }
    let color = Color::parse_or(&canvas.overlay.color, Color::BLACK).with_alpha_mul(opacity);
    ctx.set_paint(solid(color));
    ctx.fill_rect(&full);
}

fn apply_filters(
    mut rgba: Vec<u8>,
    width: u32,
    height: u32,
    filters: &ImageFilters,
) -> CardResult<Vec<u8>> {
    let blur = finite_or(filters.blur, 0.0);
    if blur > 0.0 {
        rgba = blur_rgba8_premul(&rgba, width, height, blur as f32)?;
    }
    brightness_contrast_in_place(
        &mut rgba,
        finite_or(filters.brightness, 100.0),
        finite_or(filters.contrast, 100.0),
    );
    Ok(rgba)
}

/// Shape each wrapped line and place it inside the block.
///
/// Line `i` starts `i * fontSize * lineHeight` below the block top; the shaped line box is
/// centered vertically within one `fontSize`.
fn layout_lines(t: &TextLayer, block: &TextBlock, text: &mut TextEngine) -> Vec<LineDraw> {
    let font = FontSpec::for_layer(t);
    let advance = TextBlock::line_advance(t);
    let bounds = block.bounds();
    let mut out = Vec::with_capacity(block.lines.len());
    for (i, (line, &measured)) in block.lines.iter().zip(&block.line_widths).enumerate() {
        let Some(shaped) = text.shape_line(line, &font) else {
            continue;
        };
        let x = match t.text_align {
            TextAlign::Left => bounds.x0,
            TextAlign::Center => bounds.x0 + (bounds.width() - measured) / 2.0,
            TextAlign::Right => bounds.x1 - measured,
        };
        let top = bounds.y0 + i as f64 * advance;
        let y = top + (font.size - f64::from(shaped.height)) / 2.0;
        let underline = t.underline.then(|| {
            let thickness = (font.size / 16.0).round().max(1.0);
            let base = y + f64::from(shaped.baseline) + font.size * 0.15;
            Rect::new(x, base, x + measured, base + thickness)
        });
        out.push(LineDraw {
            shaped,
            origin: Point::new(x, y),
            underline,
        });
    }
    out
}

fn draw_lines(ctx: &mut vello_cpu::RenderContext, lines: &[LineDraw], xf: Affine, color: Color) {
    ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_paint(solid(color));
    for line in lines {
        ctx.set_transform(affine_to_cpu(xf * Affine::translate(line.origin.to_vec2())));
        let glyphs = line.shaped.glyphs.iter().map(|g| vello_cpu::Glyph {
            id: g.id,
            x: g.x,
            y: g.y,
        });
        ctx.glyph_run(&line.shaped.font)
            .font_size(line.shaped.font_size)
            .fill_glyphs(glyphs);

        if let Some(bar) = line.underline {
            ctx.set_transform(affine_to_cpu(xf));
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(bar.x0, bar.y0, bar.x1, bar.y1));
        }
    }
}

fn draw_full_canvas(
    ctx: &mut vello_cpu::RenderContext,
    paint: vello_cpu::Image,
    frame: &Frame<'_>,
) {
    reset_paint_state(ctx);
    ctx.set_paint(paint);
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
        0.0,
        0.0,
        f64::from(frame.width),
        f64::from(frame.height),
    ));
}

fn finish(mut ctx: vello_cpu::RenderContext, width: u16, height: u16) -> CardResult<Surface> {
    ctx.flush();
    let mut pixmap = vello_cpu::Pixmap::new(width, height);
    ctx.render_to_pixmap(&mut pixmap);
    let data = pixmap.data_as_u8_slice().to_vec();
    if data.len() != usize::from(width) * usize::from(height) * 4 {
        return Err(CardError::validation("rendered pixmap size mismatch"));
    }
    Ok(Surface {
        width: u32::from(width),
        height: u32::from(height),
        data,
    })
}

fn solid(color: Color) -> vello_cpu::peniko::Color {
    let [r, g, b, a] = color.to_straight_u8();
    vello_cpu::peniko::Color::from_rgba8(r, g, b, a)
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn image_paint(rgba8_premul: &[u8], width: u32, height: u32) -> CardResult<vello_cpu::Image> {
    let pixmap = premul_bytes_to_pixmap(rgba8_premul, width, height)?;
    Ok(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    })
}

fn premul_bytes_to_pixmap(
    rgba8_premul: &[u8],
    width: u32,
    height: u32,
) -> CardResult<vello_cpu::Pixmap> {
    let (w, h) = checked_surface_dims(width, height)?;
    if rgba8_premul.len() != width as usize * height as usize * 4 {
        return Err(CardError::validation("image byte length mismatch"));
    }

    let mut may_have_opacities = false;
    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    for px in rgba8_premul.chunks_exact(4) {
        may_have_opacities |= px[3] != 255;
        pixels.push(vello_cpu::peniko::color::PremulRgba8 {
            r: px[0],
            g: px[1],
            b: px[2],
            a: px[3],
        });
    }
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        w,
        h,
        may_have_opacities,
    ))
}

#[cfg(test)]
#[path = "../../tests/unit/render/compositor.rs"]
mod tests;
