//! Content niches and output platforms.
//!
//! Both are closed enums parsed once at the boundary (CLI, script files)
//! and passed around as strong types afterwards.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Content niche category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Niche {
    ScaryStories,
    Finance,
    Luxury,
    TrueCrime,
    PsychologyFacts,
    History,
    Motivation,
    SpaceAstronomy,
    ConspiracyMysteries,
    AnimalFacts,
    HealthWellness,
    RelationshipAdvice,
    TechGadgets,
    LifeHacks,
    MythologyFolklore,
    UnsolvedMysteries,
    GeographyFacts,
    AiFutureTech,
    Philosophy,
    BookSummaries,
    CelebrityNetWorth,
    SurvivalTips,
    SleepRelaxation,
    NetflixRecommendations,
    MockumentaryHowmade,
}

impl Niche {
    pub const ALL: [Niche; 25] = [
        Niche::ScaryStories,
        Niche::Finance,
        Niche::Luxury,
        Niche::TrueCrime,
        Niche::PsychologyFacts,
        Niche::History,
        Niche::Motivation,
        Niche::SpaceAstronomy,
        Niche::ConspiracyMysteries,
        Niche::AnimalFacts,
        Niche::HealthWellness,
        Niche::RelationshipAdvice,
        Niche::TechGadgets,
        Niche::LifeHacks,
        Niche::MythologyFolklore,
        Niche::UnsolvedMysteries,
        Niche::GeographyFacts,
        Niche::AiFutureTech,
        Niche::Philosophy,
        Niche::BookSummaries,
        Niche::CelebrityNetWorth,
        Niche::SurvivalTips,
        Niche::SleepRelaxation,
        Niche::NetflixRecommendations,
        Niche::MockumentaryHowmade,
    ];

    /// Wire name (kebab-case).
    pub fn as_str(&self) -> &'static str {
        match self {
            Niche::ScaryStories => "scary-stories",
            Niche::Finance => "finance",
            Niche::Luxury => "luxury",
            Niche::TrueCrime => "true-crime",
            Niche::PsychologyFacts => "psychology-facts",
            Niche::History => "history",
            Niche::Motivation => "motivation",
            Niche::SpaceAstronomy => "space-astronomy",
            Niche::ConspiracyMysteries => "conspiracy-mysteries",
            Niche::AnimalFacts => "animal-facts",
            Niche::HealthWellness => "health-wellness",
            Niche::RelationshipAdvice => "relationship-advice",
            Niche::TechGadgets => "tech-gadgets",
            Niche::LifeHacks => "life-hacks",
            Niche::MythologyFolklore => "mythology-folklore",
            Niche::UnsolvedMysteries => "unsolved-mysteries",
            Niche::GeographyFacts => "geography-facts",
            Niche::AiFutureTech => "ai-future-tech",
            Niche::Philosophy => "philosophy",
            Niche::BookSummaries => "book-summaries",
            Niche::CelebrityNetWorth => "celebrity-net-worth",
            Niche::SurvivalTips => "survival-tips",
            Niche::SleepRelaxation => "sleep-relaxation",
            Niche::NetflixRecommendations => "netflix-recommendations",
            Niche::MockumentaryHowmade => "mockumentary-howmade",
        }
    }

    /// Human-readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Niche::ScaryStories => "Scary Stories",
            Niche::Finance => "Finance",
            Niche::Luxury => "Luxury",
            Niche::TrueCrime => "True Crime",
            Niche::PsychologyFacts => "Psychology Facts",
            Niche::History => "History",
            Niche::Motivation => "Motivation",
            Niche::SpaceAstronomy => "Space & Astronomy",
            Niche::ConspiracyMysteries => "Conspiracy & Mysteries",
            Niche::AnimalFacts => "Animal Facts",
            Niche::HealthWellness => "Health & Wellness",
            Niche::RelationshipAdvice => "Relationship Advice",
            Niche::TechGadgets => "Tech & Gadgets",
            Niche::LifeHacks => "Life Hacks",
            Niche::MythologyFolklore => "Mythology & Folklore",
            Niche::UnsolvedMysteries => "Unsolved Mysteries",
            Niche::GeographyFacts => "Geography Facts",
            Niche::AiFutureTech => "AI & Future Tech",
            Niche::Philosophy => "Philosophy",
            Niche::BookSummaries => "Book Summaries",
            Niche::CelebrityNetWorth => "Celebrity Net Worth",
            Niche::SurvivalTips => "Survival Tips",
            Niche::SleepRelaxation => "Sleep & Relaxation",
            Niche::NetflixRecommendations => "Netflix Recommendations",
            Niche::MockumentaryHowmade => "Mockumentary How It's Made",
        }
    }

    /// Default subreddits scraped for this niche.
    pub fn subreddits(&self) -> &'static [&'static str] {
        match self {
            Niche::ScaryStories => &["nosleep", "LetsNotMeet", "creepypasta"],
            Niche::Finance => &["personalfinance", "financialindependence", "investing"],
            Niche::Luxury => &["luxury", "watches", "cars"],
            Niche::TrueCrime => &["TrueCrime", "UnresolvedMysteries", "serialkillers"],
            Niche::PsychologyFacts => &["psychology", "AskScience", "todayilearned"],
            Niche::History => &["history", "HistoryPorn", "AskHistorians"],
            Niche::Motivation => &["GetMotivated", "DecidingToBeBetter", "selfimprovement"],
            Niche::SpaceAstronomy => &["space", "Astronomy", "astrophotography"],
            Niche::ConspiracyMysteries => &["conspiracy", "HighStrangeness", "Glitch_in_the_Matrix"],
            Niche::AnimalFacts => &["Awwducational", "NatureIsFuckingLit", "interestingasfuck"],
            Niche::HealthWellness => &["HealthyFood", "Fitness", "nutrition"],
            Niche::RelationshipAdvice => &["relationship_advice", "dating_advice", "AskMen"],
            Niche::TechGadgets => &["gadgets", "technology", "Android"],
            Niche::LifeHacks => &["lifehacks", "LifeProTips", "productivity"],
            Niche::MythologyFolklore => &["mythology", "folklore", "Lovecraft"],
            Niche::UnsolvedMysteries => &["UnsolvedMysteries", "RBI", "Disappearances"],
            Niche::GeographyFacts => &["geography", "MapPorn", "todayilearned"],
            Niche::AiFutureTech => &["Futurology", "artificial", "singularity"],
            Niche::Philosophy => &["philosophy", "Stoicism", "Existentialism"],
            Niche::BookSummaries => &["books", "booksuggestions", "52book"],
            Niche::CelebrityNetWorth => &["Celebs", "entertainment", "popculturechat"],
            Niche::SurvivalTips => &["Survival", "preppers", "Bushcraft"],
            Niche::SleepRelaxation => &["sleep", "Meditation", "asmr"],
            Niche::NetflixRecommendations => &["NetflixBestOf", "television", "MovieSuggestions"],
            Niche::MockumentaryHowmade => &["InterdimensionalCable", "funny", "AbsurdHumor"],
        }
    }
}

impl fmt::Display for Niche {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Niche {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Niche::ALL
            .iter()
            .copied()
            .find(|n| n.as_str() == wanted)
            .ok_or_else(|| ModelError::UnknownNiche(s.to_string()))
    }
}

/// Target output platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Youtube,
    Tiktok,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::Youtube, Platform::Tiktok];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Youtube => "youtube",
            Platform::Tiktok => "tiktok",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Youtube => "YouTube",
            Platform::Tiktok => "TikTok",
        }
    }

    /// Output resolution as (width, height).
    pub fn resolution(&self) -> (u32, u32) {
        match self {
            Platform::Youtube => (1920, 1080),
            Platform::Tiktok => (1080, 1920),
        }
    }

    pub fn aspect_ratio(&self) -> &'static str {
        match self {
            Platform::Youtube => "16:9",
            Platform::Tiktok => "9:16",
        }
    }

    /// Image size requested from the image generator.
    pub fn image_size(&self) -> &'static str {
        match self {
            Platform::Youtube => "1536x1024",
            Platform::Tiktok => "1024x1536",
        }
    }

    /// Maximum recommended duration in seconds.
    pub fn max_duration(&self) -> u32 {
        match self {
            Platform::Youtube => 600,
            Platform::Tiktok => 180,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "youtube" => Ok(Platform::Youtube),
            "tiktok" => Ok(Platform::Tiktok),
            _ => Err(ModelError::UnknownPlatform(s.to_string())),
        }
    }
}
