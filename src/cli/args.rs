// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use clap::{Args, Parser, Subcommand};

/// Model used when `--model` is not given.
pub const DEFAULT_MODEL: &str = "movenet_singlepose_lightning.onnx";

/// CLI arguments parser.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(after_help = r#"Run Options:
    --model, -m <MODEL>        Path to ONNX pose model [default: movenet_singlepose_lightning.onnx]
    --source, -s <SOURCE>      Camera index, image, directory or video [default: 0]
    --position <POSITION>      Initial camera position (front, back) [default: front]
    --conf <CONF>              Joint confidence threshold (exclusive) [default: 0.45]
    --edge-rule <RULE>         Gate edges on both joints or the from joint [default: both]
    --topology <TOPOLOGY>      Skeleton edges (limbs, full) [default: limbs]
    --line-width <WIDTH>       Stroke width in display pixels [default: 2]
    --line-color <COLOR>       Skeleton color [default: black]
    --fill-color <COLOR>       Background color [default: white]
    --min-size / --max-size    Capture format bounds on the shorter side [default: 720..1000]
    --device <DEVICE>          Device (cpu, cuda:0, coreml, directml:0, openvino, tensorrt:0)
    --show <BOOL>              Display frames in a window [default: true]
    --verbose <BOOL>           Show verbose output [default: true]

Examples:
    pose-overlay run --model movenet_singlepose_lightning.onnx
    pose-overlay run -m movenet.onnx --source 1 --position back
    pose-overlay run -m movenet.onnx --source dance.mp4 --topology full
    pose-overlay run -m movenet.onnx --source photos/ --show false"#)]
pub struct Cli {
    #[command(subcommand)]
    /// Subcommand to execute.
    pub command: Commands,
}

/// Commands for the CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Draw the detected skeleton over a camera, image or video source
    Run(RunArgs),
}

/// Arguments for the run command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to ONNX pose model
    #[arg(short, long, default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Camera index, image, directory or video
    #[arg(short, long, default_value = "0")]
    pub source: String,

    /// Initial camera position (front, back)
    #[arg(long, default_value = "front")]
    pub position: String,

    /// Joint confidence threshold (exclusive)
    #[arg(long, default_value_t = 0.45)]
    pub conf: f32,

    /// Gate edges on both joints or the from joint (both, from)
    #[arg(long, default_value = "both")]
    pub edge_rule: String,

    /// Skeleton edges (limbs, full)
    #[arg(long, default_value = "limbs")]
    pub topology: String,

    /// Stroke width in display pixels
    #[arg(long, default_value_t = 2.0)]
    pub line_width: f32,

    /// Skeleton color (name or #rrggbb)
    #[arg(long, default_value = "black")]
    pub line_color: String,

    /// Background color (name or #rrggbb)
    #[arg(long, default_value = "white")]
    pub fill_color: String,

    /// Minimum shorter side of the capture format
    #[arg(long, default_value_t = 720)]
    pub min_size: u32,

    /// Maximum shorter side of the capture format
    #[arg(long, default_value_t = 1000)]
    pub max_size: u32,

    /// Intra-op threads for ONNX Runtime (0 = auto)
    #[arg(long, default_value_t = 0)]
    pub threads: usize,

    /// Device to use (cpu, cuda:0, coreml, directml:0, openvino, tensorrt:0)
    #[arg(long)]
    pub device: Option<String>,

    /// Display frames in a window
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub show: bool,

    /// Show verbose output
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_args_defaults() {
        let args = Cli::parse_from(["app", "run"]);
        match args.command {
            Commands::Run(run_args) => {
                assert_eq!(run_args.model, DEFAULT_MODEL);
                assert_eq!(run_args.source, "0");
                assert_eq!(run_args.position, "front");
                assert!((run_args.conf - 0.45).abs() < f32::EPSILON);
                assert!((run_args.line_width - 2.0).abs() < f32::EPSILON);
                assert_eq!((run_args.min_size, run_args.max_size), (720, 1000));
                assert!(run_args.show);
                assert!(run_args.verbose);
                assert!(run_args.device.is_none());
            }
        }
    }

    #[test]
    fn test_run_args_custom() {
        let args = Cli::parse_from([
            "app",
            "run",
            "-m",
            "custom.onnx",
            "-s",
            "clip.mp4",
            "--edge-rule",
            "from",
            "--line-color",
            "#ff0000",
            "--show",
            "false",
            "--verbose",
            "false",
        ]);
        match args.command {
            Commands::Run(run_args) => {
                assert_eq!(run_args.model, "custom.onnx");
                assert_eq!(run_args.source, "clip.mp4");
                assert_eq!(run_args.edge_rule, "from");
                assert_eq!(run_args.line_color, "#ff0000");
                assert!(!run_args.show);
                assert!(!run_args.verbose);
            }
        }
    }
}
