//! CLI tests

use clap::Parser;

use crate::{Cli, Commands, GalleryAction, OutputFormat, decode_data_url, default_image_path};

#[test]
fn test_image_args_parse() {
    let cli = Cli::try_parse_from([
        "contentforge",
        "image",
        "a harbor at dawn",
        "--style",
        "Vibrant",
        "--complexity",
        "70",
        "--out",
        "harbor.png",
        "--save",
    ])
    .unwrap();

    match cli.command {
        Commands::Image {
            prompt,
            style,
            complexity,
            out,
            save,
            ..
        } => {
            assert_eq!(prompt, "a harbor at dawn");
            assert_eq!(style.as_deref(), Some("Vibrant"));
            assert_eq!(complexity, Some(70));
            assert_eq!(out.unwrap().to_str(), Some("harbor.png"));
            assert!(save);
        }
        _ => panic!("expected image command"),
    }
}

#[test]
fn test_complexity_out_of_range_rejected() {
    let result = Cli::try_parse_from(["contentforge", "image", "x", "--complexity", "101"]);
    assert!(result.is_err());
}

#[test]
fn test_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from([
        "contentforge",
        "gallery",
        "list",
        "--type",
        "image",
        "--format",
        "json",
        "--server",
        "http://example.test",
    ])
    .unwrap();

    assert!(cli.format == OutputFormat::Json);
    assert_eq!(cli.server.as_deref(), Some("http://example.test"));
    match cli.command {
        Commands::Gallery {
            action: GalleryAction::List { kind, limit },
        } => {
            assert_eq!(kind.as_deref(), Some("image"));
            assert_eq!(limit, None);
        }
        _ => panic!("expected gallery list"),
    }
}

#[test]
fn test_login_requires_email_and_password() {
    assert!(Cli::try_parse_from(["contentforge", "login", "--email", "a@b.c"]).is_err());
}

#[test]
fn test_decode_data_url() {
    let image = decode_data_url("data:image/png;base64,iVBORw0KGgo=").unwrap();
    assert_eq!(image.mime_type, "image/png");
    assert_eq!(&image.bytes[1..4], b"PNG");
    assert!(
        default_image_path(&image)
            .to_string_lossy()
            .ends_with(".png")
    );

    assert!(decode_data_url("https://example.test/a.png").is_err());
    assert!(decode_data_url("data:image/png,raw").is_err());
    assert!(decode_data_url("data:image/png;base64,").is_err());
}
