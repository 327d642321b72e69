use crate::classify::classify;
use crate::models::ClassifiedSource;

/// Print how each token would be harvested.
pub fn list_sources(tokens: &[String]) {
    let classified: Vec<_> = tokens.iter().map(|t| classify(t)).collect();
    print!("{}", format_sources(&classified));
}

fn format_sources(sources: &[ClassifiedSource]) -> String {
    let mut out = format!("{:<8} {:<20} REFERENCE\n", "KIND", "NAME");
    for source in sources {
        out.push_str(&format!(
            "{:<8} {:<20} {}\n",
            source.source.kind_label(),
            source.display_name,
            source.source.reference()
        ));
    }
    out
}
