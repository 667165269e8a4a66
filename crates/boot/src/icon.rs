use std::path::{Path, PathBuf};

use image::{GenericImage, GenericImageView};

use refind_btrfs_common::config::{
    BtrfsLogoSpec, HorizontalAlignment, Icon, VerticalAlignment,
};
use refind_btrfs_common::errors::{RefindBtrfsError, Result};

const CUSTOM_ICON_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "icns"];

/// `validate_custom`: the custom icon's extension must be a recognized raster
/// format and the file must exist.
pub fn validate_custom(path: &Path) -> Result<()> {
    if !path.is_file() {
        return Err(RefindBtrfsError::refind_config(
            path,
            "custom icon file does not exist",
        ));
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext {
        Some(e) if CUSTOM_ICON_EXTENSIONS.contains(&e.as_str()) => Ok(()),
        _ => Err(RefindBtrfsError::refind_config(
            path,
            "custom icon must be one of: png, jpg, jpeg, bmp, icns",
        )),
    }
}

fn offset(icon_extent: u32, logo_extent: u32, alignment_is_min: bool, alignment_is_max: bool) -> i64 {
    if alignment_is_min {
        0
    } else if alignment_is_max {
        icon_extent as i64 - logo_extent as i64
    } else {
        (icon_extent as i64 - logo_extent as i64) / 2
    }
}

/// `embed_logo`: composites `logo_path` over `source_icon` at the alignment
/// described by `spec`, writing the result under `output_dir` and returning
/// its path. Errors if the logo is larger than the icon in either dimension.
pub fn embed_logo(
    source_icon: &Path,
    logo_path: &Path,
    spec: &BtrfsLogoSpec,
    output_dir: &Path,
) -> Result<PathBuf> {
    let mut icon = image::open(source_icon)
        .map_err(|e| RefindBtrfsError::refind_config(source_icon, format!("failed to open icon: {e}")))?;
    let logo = image::open(logo_path)
        .map_err(|e| RefindBtrfsError::refind_config(logo_path, format!("failed to open logo: {e}")))?;

    let (icon_w, icon_h) = icon.dimensions();
    let (logo_w, logo_h) = logo.dimensions();

    if logo_w > icon_w || logo_h > icon_h {
        return Err(RefindBtrfsError::refind_config(
            source_icon,
            "icon is smaller than the btrfs logo to embed",
        ));
    }

    let h_offset = offset(
        icon_w,
        logo_w,
        spec.horizontal_alignment == HorizontalAlignment::Left,
        spec.horizontal_alignment == HorizontalAlignment::Right,
    );
    let v_offset = offset(
        icon_h,
        logo_h,
        spec.vertical_alignment == VerticalAlignment::Top,
        spec.vertical_alignment == VerticalAlignment::Bottom,
    );

    image::imageops::overlay(&mut icon, &logo, h_offset, v_offset);

    std::fs::create_dir_all(output_dir)?;

    let base = source_icon
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "icon".to_string());
    let logo_name = logo_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "logo".to_string());

    let output_path = output_dir.join(format!(
        "{base}_{logo_name}_h-{h_offset}_v-{v_offset}.png"
    ));

    icon.save(&output_path)
        .map_err(|e| RefindBtrfsError::refind_config(output_path.as_path(), format!("failed to save composited icon: {e}")))?;

    Ok(output_path)
}

/// Dispatches on [`Icon`] to produce the migrated entry's icon path.
pub fn resolve_icon(
    icon: &Icon,
    source_icon_path: Option<&str>,
    logo_library_dir: &Path,
    output_dir: &Path,
) -> Result<Option<PathBuf>> {
    match icon {
        Icon::Default => Ok(source_icon_path.map(PathBuf::from)),
        Icon::Custom { path } => {
            validate_custom(path)?;
            Ok(Some(path.clone()))
        }
        Icon::EmbedBtrfsLogo { btrfs_logo } => {
            let Some(source) = source_icon_path else {
                return Ok(None);
            };
            let logo_path = logo_library_dir.join(btrfs_logo.logo_filename());
            let composited = embed_logo(Path::new(source), &logo_path, btrfs_logo, output_dir)?;
            Ok(Some(composited))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};
    use refind_btrfs_common::config::{BtrfsLogoSize, BtrfsLogoVariant};

    fn write_png(path: &Path, w: u32, h: u32, color: [u8; 4]) {
        let img: ImageBuffer<Rgba<u8>, Vec<u8>> = ImageBuffer::from_pixel(w, h, Rgba(color));
        img.save(path).unwrap();
    }

    fn spec(h: HorizontalAlignment, v: VerticalAlignment) -> BtrfsLogoSpec {
        BtrfsLogoSpec {
            variant: BtrfsLogoVariant::Original,
            size: BtrfsLogoSize::Small,
            horizontal_alignment: h,
            vertical_alignment: v,
        }
    }

    #[test]
    fn validate_custom_rejects_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(validate_custom(&tmp.path().join("nope.png")).is_err());
    }

    #[test]
    fn validate_custom_rejects_unsupported_extension() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("icon.svg");
        std::fs::write(&path, b"not a raster image").unwrap();
        assert!(validate_custom(&path).is_err());
    }

    #[test]
    fn validate_custom_accepts_a_real_png() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("icon.png");
        write_png(&path, 4, 4, [255, 0, 0, 255]);
        assert!(validate_custom(&path).is_ok());
    }

    #[test]
    fn validate_custom_accepts_an_icns_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("icon.icns");
        std::fs::write(&path, b"icns").unwrap();
        assert!(validate_custom(&path).is_ok());
    }

    #[test]
    fn embed_logo_centers_by_default_alignment() {
        let tmp = tempfile::tempdir().unwrap();
        let icon_path = tmp.path().join("os_arch.png");
        let logo_path = tmp.path().join("btrfs-original-small.png");
        write_png(&icon_path, 64, 64, [255, 255, 255, 255]);
        write_png(&logo_path, 16, 16, [0, 0, 0, 255]);

        let output_dir = tmp.path().join("out");
        let result = embed_logo(
            &icon_path,
            &logo_path,
            &spec(HorizontalAlignment::Center, VerticalAlignment::Center),
            &output_dir,
        )
        .unwrap();

        assert!(result.exists());
        assert_eq!(result.parent().unwrap(), output_dir);
        assert!(result
            .file_name()
            .unwrap()
            .to_string_lossy()
            .contains("h-24_v-24"));
    }

    #[test]
    fn embed_logo_rejects_a_logo_larger_than_the_icon() {
        let tmp = tempfile::tempdir().unwrap();
        let icon_path = tmp.path().join("os_arch.png");
        let logo_path = tmp.path().join("btrfs-original-large.png");
        write_png(&icon_path, 8, 8, [255, 255, 255, 255]);
        write_png(&logo_path, 16, 16, [0, 0, 0, 255]);

        let err = embed_logo(
            &icon_path,
            &logo_path,
            &spec(HorizontalAlignment::Center, VerticalAlignment::Center),
            &tmp.path().join("out"),
        )
        .unwrap_err();
        assert!(err.to_string().contains("smaller"));
    }

    #[test]
    fn resolve_icon_default_passes_through_the_existing_path_unchanged() {
        let resolved = resolve_icon(
            &Icon::Default,
            Some("/EFI/refind/icons/os_arch.png"),
            Path::new("/unused"),
            Path::new("/unused"),
        )
        .unwrap();
        assert_eq!(resolved, Some(PathBuf::from("/EFI/refind/icons/os_arch.png")));
    }

    #[test]
    fn resolve_icon_embed_with_no_existing_icon_is_a_noop() {
        let resolved = resolve_icon(
            &Icon::EmbedBtrfsLogo {
                btrfs_logo: spec(HorizontalAlignment::Center, VerticalAlignment::Center),
            },
            None,
            Path::new("/unused"),
            Path::new("/unused"),
        )
        .unwrap();
        assert_eq!(resolved, None);
    }

    #[test]
    fn resolve_icon_custom_validates_before_substituting() {
        let tmp = tempfile::tempdir().unwrap();
        let bad_path = tmp.path().join("missing.png");

        let err = resolve_icon(
            &Icon::Custom { path: bad_path },
            Some("/EFI/refind/icons/os_arch.png"),
            Path::new("/unused"),
            Path::new("/unused"),
        )
        .unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
