use std::path::Path;
use tera::Tera;

/// Pages compiled into the binary, keyed by the name handlers render.
const EMBEDDED: &[(&str, &str)] = &[
    ("base.html", include_str!("../templates/base.html")),
    ("index.html", include_str!("../templates/index.html")),
    ("list_papers.html", include_str!("../templates/list_papers.html")),
    ("conference_papers.html", include_str!("../templates/conference_papers.html")),
    ("paper_detail.html", include_str!("../templates/paper_detail.html")),
    ("overview.html", include_str!("../templates/overview.html")),
    ("reviewers.html", include_str!("../templates/reviewers.html")),
    ("review_papers.html", include_str!("../templates/review_papers.html")),
];

/// Loads the embedded pages, then lets any `*.html` in `override_dir`
/// replace the page of the same name.
pub fn load(override_dir: Option<&Path>) -> Result<Tera, tera::Error> {
    let mut tera = Tera::default();
    tera.add_raw_templates(EMBEDDED.iter().copied())?;

    let Some(dir) = override_dir.filter(|d| d.exists()) else {
        return Ok(tera);
    };

    let files: Vec<_> = std::fs::read_dir(dir)
        .map_err(|e| tera::Error::msg(format!("reading {}: {}", dir.display(), e)))?
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.extension().map_or(false, |ext| ext == "html"))
        .filter_map(|p| {
            let name = p.file_name()?.to_str()?.to_string();
            Some((p, Some(name)))
        })
        .collect();

    tracing::info!("Loading {} template override(s) from {}", files.len(), dir.display());
    tera.add_template_files(files)?;
    Ok(tera)
}
