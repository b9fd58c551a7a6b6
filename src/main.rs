//! Headless snapshot renderer: draws an image and a set of boxes through
//! both canvas layers and writes the composite as PNG.
//!
//!   fovcanvas-snapshot slide.png out.png --box 10 10 80 40 --box 120 60 30 30

#[cfg(not(target_arch = "wasm32"))]
mod cli {
    use std::path::PathBuf;
    use std::process::ExitCode;

    use clap::Parser;

    use fovcanvas::canvas::{Canvas, CanvasRenderer, ImageContent};
    use fovcanvas::config::{EngineConfig, LogLevel};
    use fovcanvas::geometry::Rect;
    use fovcanvas::interaction::BoxEditor;
    use fovcanvas::logging::init_logging;
    use fovcanvas::model::{AnnotationBox, BoxId, EditMode};
    use fovcanvas::preload::decode_image;
    use fovcanvas::render::{DisplayMode, RasterSurface, SurfaceLayout};
    use fovcanvas::scheduler::FrameScheduler;
    use fovcanvas::viewport::Viewport;

    /// Render an image with box annotations to a PNG.
    #[derive(Parser, Debug)]
    #[command(name = "fovcanvas-snapshot", version, about)]
    pub struct SnapshotArgs {
        /// Source image
        pub image: PathBuf,

        /// Output PNG
        #[arg(default_value = "snapshot.png")]
        pub output: PathBuf,

        /// Box in image pixels; repeat for more boxes
        #[arg(
            long = "box",
            num_args = 4,
            value_names = ["X", "Y", "W", "H"],
            allow_negative_numbers = true
        )]
        pub boxes: Vec<f32>,

        /// Container width in CSS pixels (defaults to the image width)
        #[arg(long)]
        pub width: Option<f32>,

        /// Container height in CSS pixels (defaults to the image height)
        #[arg(long)]
        pub height: Option<f32>,

        /// Device pixel ratio
        #[arg(long, default_value_t = 1.0)]
        pub dpr: f32,

        /// Display mode: normal, grayscale, inverted, fire, hi-lo, green
        #[arg(long, default_value = "normal")]
        pub display_mode: String,

        /// Select this box (1-based, in argument order)
        #[arg(long)]
        pub select: Option<BoxId>,

        /// Configuration file (defaults to the user config)
        #[arg(long)]
        pub config: Option<PathBuf>,

        /// Log verbosity, overrides the config
        #[arg(long)]
        pub log_level: Option<String>,
    }

    fn parse_log_level(value: &str) -> Option<LogLevel> {
        LogLevel::all()
            .iter()
            .copied()
            .find(|l| l.name().eq_ignore_ascii_case(value))
    }

    fn parse_display_mode(value: &str) -> Option<DisplayMode> {
        DisplayMode::all()
            .iter()
            .copied()
            .find(|m| m.name().eq_ignore_ascii_case(value))
    }

    pub fn run(args: SnapshotArgs) -> Result<(), Box<dyn std::error::Error>> {
        let config = match &args.config {
            Some(path) => EngineConfig::load_from_path(path)?,
            None => EngineConfig::load_or_default(),
        };
        let level = args
            .log_level
            .as_deref()
            .and_then(parse_log_level)
            .unwrap_or(config.preferences.log_level);
        init_logging(level);

        let bytes = std::fs::read(&args.image)?;
        let image = decode_image(&bytes)?;
        log::info!(
            "Rendering {:?} ({}x{})",
            args.image,
            image.width(),
            image.height()
        );

        let boxes: Vec<AnnotationBox> = args
            .boxes
            .chunks_exact(4)
            .zip(1..)
            .map(|(v, id)| AnnotationBox::new(id, Rect::new(v[0], v[1], v[2], v[3])))
            .collect();

        let mut editor = BoxEditor::new(EditMode::View, config.interaction.to_settings());
        editor.load_boxes(boxes);
        if let Some(id) = args.select {
            editor.select(id);
        }

        let (iw, ih) = image.size();
        let layout = SurfaceLayout::new(
            args.width.unwrap_or(iw),
            args.height.unwrap_or(ih),
            args.dpr,
        );
        editor.set_viewport(Viewport::fit_to(
            (iw, ih),
            (layout.width, layout.height),
            &editor.settings().zoom,
        ));

        let mut renderer = CanvasRenderer::default();
        match parse_display_mode(&args.display_mode) {
            Some(mode) => renderer.set_display_mode(mode),
            None => log::warn!("Unknown display mode {:?}, using normal", args.display_mode),
        }
        let (bw, bh) = layout.backing_size();
        let mut canvas = Canvas::new(renderer, RasterSurface::new(bw, bh)?, RasterSurface::new(bw, bh)?);

        let mut scheduler = FrameScheduler::new();
        scheduler.request_resize(layout);
        scheduler.mark_all();
        let content = ImageContent::Ready(image);
        if let Some(plan) = scheduler.begin_frame() {
            canvas.draw(&plan, &content, &editor)?;
        }

        let png = RasterSurface::composite_png(&[canvas.image_surface(), canvas.overlay_surface()])?;
        std::fs::write(&args.output, png)?;
        log::info!("Wrote {:?}", args.output);
        Ok(())
    }

    pub fn main() -> ExitCode {
        let args = SnapshotArgs::parse();
        match run(args) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("fovcanvas-snapshot: {}", e);
                ExitCode::FAILURE
            }
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> std::process::ExitCode {
    cli::main()
}

#[cfg(target_arch = "wasm32")]
fn main() {}
