use crate::error::{FetchError, Result};
use crate::result::{CandidateLink, MatchRule};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};

/// Page-specific heuristics used to pick the download link.
#[derive(Debug, Clone)]
pub struct TargetProfile {
    /// Tag name of the section heading, e.g. `h3`
    pub heading: String,
    /// Heading text to match, compared trimmed and lowercased
    pub phrase: String,
    /// Attribute marking a content column around the heading
    pub container_attr: String,
    /// Required href suffix
    pub extension: String,
    pub filename_fragment: String,
    pub path_fragment: String,
    pub keywords: Vec<String>,
    /// Used when the resolved URL has no final path segment
    pub default_filename: String,
}

impl Default for TargetProfile {
    fn default() -> Self {
        Self {
            heading: "h3".to_string(),
            phrase: "broker protocol member firms".to_string(),
            container_attr: "data-column-content".to_string(),
            extension: ".xlsx".to_string(),
            filename_fragment: "The-Broker-Protocol-Member-Firms".to_string(),
            path_fragment: "Broker-Protocol".to_string(),
            keywords: ["broker", "protocol", "member", "firms"]
                .iter()
                .map(|k| k.to_string())
                .collect(),
            default_filename: "broker-protocol-member-firms.xlsx".to_string(),
        }
    }
}

type Rule = fn(&LinkResolver, &Html) -> Option<CandidateLink>;

/// Heuristics in priority order; the first rule to produce a link wins.
const RULES: &[Rule] = &[
    LinkResolver::by_section_heading,
    LinkResolver::by_filename_fragment,
    LinkResolver::by_path_fragment,
    LinkResolver::by_keyword,
];

pub struct LinkResolver {
    profile: TargetProfile,
    heading_selector: Selector,
    link_selector: Selector,
}

impl LinkResolver {
    pub fn new(profile: TargetProfile) -> Result<Self> {
        let heading_selector = Selector::parse(&profile.heading).map_err(|e| {
            FetchError::ParseError(format!("Invalid heading selector '{}': {}", profile.heading, e))
        })?;
        let link_selector = Selector::parse("a[href]")
            .map_err(|e| FetchError::ParseError(format!("Invalid link selector: {}", e)))?;

        Ok(Self {
            profile,
            heading_selector,
            link_selector,
        })
    }

    pub fn profile(&self) -> &TargetProfile {
        &self.profile
    }

    /// Parse `html` and run the rule pipeline over it.
    pub fn resolve(&self, html: &str) -> Option<CandidateLink> {
        let document = Html::parse_document(html);
        self.resolve_document(&document)
    }

    pub fn resolve_document(&self, document: &Html) -> Option<CandidateLink> {
        let found = RULES.iter().find_map(|rule| rule(self, document));

        match &found {
            Some(link) => info!("Resolved link {} via {} rule", link.href, link.rule),
            None => debug!(
                "No rule matched; {} link(s) end in {}",
                self.spreadsheet_hrefs(document).len(),
                self.profile.extension
            ),
        }

        found
    }

    /// Every href in the document ending in the target extension, in document order.
    pub fn spreadsheet_hrefs(&self, document: &Html) -> Vec<String> {
        document
            .select(&self.link_selector)
            .filter_map(|a| a.value().attr("href"))
            .filter(|href| self.has_extension(href))
            .map(|href| href.to_string())
            .collect()
    }

    fn by_section_heading(&self, document: &Html) -> Option<CandidateLink> {
        let phrase = self.profile.phrase.trim().to_lowercase();
        let heading = document
            .select(&self.heading_selector)
            .find(|h| h.text().collect::<String>().trim().to_lowercase() == phrase)?;

        debug!("Found section heading '{}'", self.profile.phrase);

        let scope = self.section_scope(heading)?;
        scope
            .select(&self.link_selector)
            .find(|a| a.value().attr("href").is_some_and(|href| self.has_extension(href)))
            .and_then(|a| candidate(a, MatchRule::SectionHeading))
    }

    fn by_filename_fragment(&self, document: &Html) -> Option<CandidateLink> {
        let fragment = self.profile.filename_fragment.as_str();
        if fragment.is_empty() {
            return None;
        }
        self.first_link(document, MatchRule::FilenameFragment, |href| {
            self.has_extension(href) && href.contains(fragment)
        })
    }

    fn by_path_fragment(&self, document: &Html) -> Option<CandidateLink> {
        let fragment = self.profile.path_fragment.as_str();
        if fragment.is_empty() {
            return None;
        }
        self.first_link(document, MatchRule::PathFragment, |href| {
            href.contains(fragment) && self.has_extension(href)
        })
    }

    fn by_keyword(&self, document: &Html) -> Option<CandidateLink> {
        let keywords: Vec<String> = self
            .profile
            .keywords
            .iter()
            .filter(|k| !k.is_empty())
            .map(|k| k.to_lowercase())
            .collect();
        if keywords.is_empty() {
            return None;
        }
        self.first_link(document, MatchRule::Keyword, |href| {
            if !self.has_extension(href) {
                return false;
            }
            let lowered = href.to_lowercase();
            keywords.iter().any(|k| lowered.contains(k.as_str()))
        })
    }

    fn first_link(
        &self,
        document: &Html,
        rule: MatchRule,
        matches: impl Fn(&str) -> bool,
    ) -> Option<CandidateLink> {
        document
            .select(&self.link_selector)
            .find(|a| a.value().attr("href").is_some_and(&matches))
            .and_then(|a| candidate(a, rule))
    }

    /// Closest element (the heading included) carrying the container attribute,
    /// falling back to the heading's parent.
    fn section_scope<'a>(&self, heading: ElementRef<'a>) -> Option<ElementRef<'a>> {
        let attr = self.profile.container_attr.as_str();
        if heading.value().attr(attr).is_some() {
            return Some(heading);
        }

        heading
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().attr(attr).is_some())
            .or_else(|| heading.parent().and_then(ElementRef::wrap))
    }

    fn has_extension(&self, href: &str) -> bool {
        href.ends_with(self.profile.extension.as_str())
    }
}

fn candidate(anchor: ElementRef<'_>, rule: MatchRule) -> Option<CandidateLink> {
    let href = anchor.value().attr("href")?;
    let text = anchor
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ");

    Some(CandidateLink {
        href: href.to_string(),
        text,
        rule,
    })
}
