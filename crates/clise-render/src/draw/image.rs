use super::{DrawContext, blend_mix};
use crate::cache::BlurVariant;
use crate::effects::ColorMatrix;
use crate::surface::Surface;
use clise_core::Element;
use clise_core::elements::ImageProps;
use kurbo::Rect;
use peniko::Color;

/// Draw an image element stretched into its normalized rect.
///
/// Sources that are still decoding (or failed) draw nothing; the image cache
/// asks for another frame once a decode lands.
pub fn draw_image(surface: &mut dyn Surface, ctx: &mut DrawContext<'_>, element: &Element, props: &ImageProps) {
    let Some(image) = ctx.caches.images.get_cached_image(&props.src) else {
        return;
    };
    let dst = element.normalized_rect();
    if image.width == 0 || image.height == 0 || dst.is_zero_area() {
        return;
    }
    let src = full_source(image.width, image.height);

    let alpha = element.opacity.clamp(0.0, 1.0) as f32;
    if alpha <= 0.0 {
        return;
    }
    let filter = props
        .effects
        .as_ref()
        .and_then(|fx| ctx.caches.blurs.get(BlurVariant::Layer, fx.blur));
    let mut paint = ctx.caches.paints.fill(Color::WHITE.with_alpha(alpha));
    if let Some(effects) = &props.effects {
        paint.image_filter = filter;
        paint.blend_mode = blend_mix(effects.blend_mode);
        paint.color_filter = ColorMatrix::from_adjustments(&effects.adjustments);
    }
    surface.draw_image(&image, src, dst, &paint);
}

/// Source rect covering the whole of an image of the given pixel size.
pub fn full_source(width: u32, height: u32) -> Rect {
    Rect::new(0.0, 0.0, width as f64, height as f64)
}

#[cfg(test)]
mod tests {
    use crate::cache::{ImageState, RenderCaches};
    use crate::draw::{DrawContext, draw_element};
    use crate::renderer::Theme;
    use crate::surface::{DrawCommand, RecordingSurface};
    use base64::Engine;
    use clise_core::elements::{ColorAdjustments, ImageEffects};
    use clise_core::{BlendMode, Element, ElementKind};
    use std::io::Cursor;
    use std::time::Duration;

    fn png_data_url() -> String {
        let img = image::RgbaImage::from_pixel(4, 2, image::Rgba([10, 20, 30, 255]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(bytes)
        )
    }

    fn wait_ready(caches: &mut RenderCaches, src: &str) {
        for _ in 0..500 {
            caches.images.poll();
            if matches!(caches.images.state(src), Some(ImageState::Ready(_))) {
                return;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        panic!("image never decoded");
    }

    #[test]
    fn test_pending_image_draws_nothing_then_draws() {
        let src = png_data_url();
        let mut element = Element::image(10.0, 10.0, -40.0, 20.0, src.clone());
        if let ElementKind::Image(props) = &mut element.kind {
            props.effects = Some(ImageEffects {
                blur: 3.0,
                blend_mode: BlendMode::Multiply,
                adjustments: ColorAdjustments {
                    brightness: 0.2,
                    contrast: 0.0,
                    saturation: 0.0,
                },
            });
        }
        element.opacity = 0.5;

        let mut caches = RenderCaches::default();
        let mut surface = RecordingSurface::new();
        {
            let mut ctx = DrawContext::new(&mut caches, 1.0, Theme::Light);
            draw_element(&mut surface, &mut ctx, &element, false);
        }
        assert!(surface.commands().is_empty());

        wait_ready(&mut caches, &src);
        let mut ctx = DrawContext::new(&mut caches, 1.0, Theme::Light);
        draw_element(&mut surface, &mut ctx, &element, false);
        match surface.commands() {
            [DrawCommand::Image { width, height, src, dst, paint }] => {
                assert_eq!((*width, *height), (4, 2));
                assert_eq!(*src, super::full_source(4, 2));
                assert_eq!(*dst, kurbo::Rect::new(-30.0, 10.0, 10.0, 30.0));
                assert!((paint.alpha() - 0.5).abs() < 1e-6);
                assert_eq!(paint.blend_mode, peniko::Mix::Multiply);
                assert!(paint.image_filter.is_some());
                assert!(paint.color_filter.is_some());
            }
            other => panic!("unexpected commands {other:?}"),
        }
    }

    #[test]
    fn test_remote_image_never_draws() {
        let element = Element::image(0.0, 0.0, 10.0, 10.0, "https://example.com/a.png");
        let mut caches = RenderCaches::default();
        let mut surface = RecordingSurface::new();
        let mut ctx = DrawContext::new(&mut caches, 1.0, Theme::Light);
        draw_element(&mut surface, &mut ctx, &element, false);
        assert!(surface.commands().is_empty());
    }
}
