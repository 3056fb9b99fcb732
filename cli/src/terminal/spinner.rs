use indicatif::ProgressStyle;

const TICK_STRINGS: &[&str] = &[
    "▁▁▁▁▁",
    "▁▂▂▂▁",
    "▁▄▂▄▁",
    "▂▄▆▄▂",
    "▄▆█▆▄",
    "▂▄▆▄▂",
    "▁▄▂▄▁",
    "▁▂▂▂▁",
];

/// Style of the spinner shown while a pipeline stage runs.
pub fn stage_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.blue} {span_fields} {elapsed:.dim}")
        .unwrap()
        .tick_strings(TICK_STRINGS)
}
