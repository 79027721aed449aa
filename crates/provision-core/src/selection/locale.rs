/// Score at or above which two locales are interchangeable.
pub const PERFECT_MATCH: f64 = 1.0;
/// Score at or above which a locale is an acceptable substitute.
pub const COMPATIBLE_MATCH: f64 = 0.8;
/// Score assigned to an installer that declares no locale.
pub const UNKNOWN_SCORE: f64 = 0.5;

/// Scores how well `candidate` satisfies `preferred`, in `[0.0, 1.0]`.
pub trait LocaleDistance: Send + Sync {
    fn distance(&self, preferred: &str, candidate: &str) -> f64;
}

/// Subtag comparison over BCP-47 tags.
#[derive(Clone, Copy, Debug, Default)]
pub struct Bcp47Distance;

impl LocaleDistance for Bcp47Distance {
    fn distance(&self, preferred: &str, candidate: &str) -> f64 {
        let preferred = LanguageTag::parse(preferred);
        let candidate = LanguageTag::parse(candidate);

        if preferred.language.is_empty() || preferred.language != candidate.language {
            return 0.0;
        }
        if preferred == candidate {
            return PERFECT_MATCH;
        }

        let script_matches = matches!(
            (&preferred.script, &candidate.script),
            (Some(left), Some(right)) if left == right
        );
        let region_matches = matches!(
            (&preferred.region, &candidate.region),
            (Some(left), Some(right)) if left == right
        );
        if script_matches || region_matches {
            0.9
        } else {
            COMPATIBLE_MATCH
        }
    }
}

#[derive(Debug, Eq, PartialEq)]
struct LanguageTag {
    language: String,
    script: Option<String>,
    region: Option<String>,
    rest: Vec<String>,
}

impl LanguageTag {
    fn parse(raw: &str) -> Self {
        let mut subtags = raw
            .split(['-', '_'])
            .filter(|subtag| !subtag.is_empty())
            .map(str::to_ascii_lowercase);
        let language = subtags.next().unwrap_or_default();
        let mut script = None;
        let mut region = None;
        let mut rest = Vec::new();

        for subtag in subtags {
            let is_script = subtag.len() == 4 && subtag.chars().all(|c| c.is_ascii_alphabetic());
            let is_region = (subtag.len() == 2 && subtag.chars().all(|c| c.is_ascii_alphabetic()))
                || (subtag.len() == 3 && subtag.chars().all(|c| c.is_ascii_digit()));

            if is_script && script.is_none() && region.is_none() && rest.is_empty() {
                script = Some(subtag);
            } else if is_region && region.is_none() && rest.is_empty() {
                region = Some(subtag);
            } else {
                rest.push(subtag);
            }
        }

        Self {
            language,
            script,
            region,
            rest,
        }
    }
}
