//! Static guide tables keyed by classifier label.

use crate::session::ModelSlot;

/// Hairstyle guidance for one face shape.
#[derive(Debug, PartialEq, Eq)]
pub struct RecommendationEntry {
    pub summary: &'static str,
    pub short_style: &'static str,
    pub long_style: &'static str,
    pub images: &'static [&'static str],
}

/// Colour palette guidance for one personal tone.
#[derive(Debug, PartialEq, Eq)]
pub struct ToneEntry {
    pub summary: &'static str,
    pub hair: &'static str,
    pub clothing: &'static str,
    pub makeup: &'static str,
    pub image: &'static str,
}

/// Read-only mapping from label to entry with a fallback for unknown labels.
#[derive(Debug)]
pub struct GuideTable<E: 'static> {
    entries: &'static [(&'static str, E)],
    fallback: E,
}

/// Result of a table lookup. `found` is false when the fallback was used.
#[derive(Debug, PartialEq, Eq)]
pub struct Lookup<E: 'static> {
    pub entry: &'static E,
    pub found: bool,
}

impl<E: 'static> Clone for Lookup<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E: 'static> Copy for Lookup<E> {}

impl<E: 'static> GuideTable<E> {
    pub fn lookup(&'static self, label: &str) -> Lookup<E> {
        match self.entries.iter().find(|(key, _)| *key == label) {
            Some((_, entry)) => Lookup { entry, found: true },
            None => Lookup {
                entry: &self.fallback,
                found: false,
            },
        }
    }

    pub fn labels(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(key, _)| *key)
    }

    pub fn fallback(&'static self) -> &'static E {
        &self.fallback
    }
}

pub type RecommendationTable = GuideTable<RecommendationEntry>;
pub type ToneTable = GuideTable<ToneEntry>;

pub static FACE_SHAPE_TABLE: RecommendationTable = GuideTable {
    entries: &[
        (
            "Oval",
            RecommendationEntry {
                summary: "The most versatile face shape. Naturally suits most hairstyles.",
                short_style: "Crop cut, undercut, bob.",
                long_style: "Layered cuts, natural waves.",
                images: &["images/oval_short.png", "images/oval_long.png"],
            },
        ),
        (
            "Round",
            RecommendationEntry {
                summary: "Styles that look longer and sharper work well. Best with styles that add vertical length and slim the sides.",
                short_style: "Asymmetrical cuts, volume on top.",
                long_style: "Long bob, side-flowing layers.",
                images: &["images/round_short.png", "images/round_long.png"],
            },
        ),
        (
            "Square",
            RecommendationEntry {
                summary: "Reduce sharp angles and add soft lines. Softens a strong jawline with gentle curves.",
                short_style: "Textured cuts, side-swept styles.",
                long_style: "Waves with face-framing layers.",
                images: &["images/square_short.png", "images/square_long.png"],
            },
        ),
        (
            "Heart",
            RecommendationEntry {
                summary: "Keep the top light and add volume toward the bottom. Balances a wider forehead and narrower chin.",
                short_style: "Side bangs, face-hugging layers.",
                long_style: "Heavier layers below the chin, side parts.",
                images: &["images/heart_short.png", "images/heart_long.png"],
            },
        ),
        (
            "Oblong",
            RecommendationEntry {
                summary: "Shorten the appearance of length and widen the silhouette. Works best with styles that reduce length and increase width.",
                short_style: "Jaw-line bobs, forehead-covering bangs.",
                long_style: "Medium-length layers, styles with side volume.",
                images: &["images/oblong_short.png", "images/oblong_long.png"],
            },
        ),
    ],
    fallback: RecommendationEntry {
        summary: "No recommendation data found for this face shape.",
        short_style: "No short hairstyle guidance available.",
        long_style: "No long hairstyle guidance available.",
        images: &[],
    },
};

pub static PERSONAL_TONE_TABLE: ToneTable = GuideTable {
    entries: &[
        (
            "Cool",
            ToneEntry {
                summary: "Blue-based and purple-based cool hues make the skin look clearer and brighter.",
                hair: "Ash brown, ash blonde, blue-black",
                clothing: "Light tones: Ice blue, lavender, lilac pink | Dark tones: Navy, charcoal gray, burgundy | Neutrals: White, cool gray",
                makeup: "Lips: Raspberry, fuchsia, cool pink | Eyes: Mauve, silver, cool brown | Blush: Rose pink, lilac pink",
                image: "images/cool_tone.png",
            },
        ),
        (
            "Warm",
            ToneEntry {
                summary: "Yellow-based and orange-based warm hues enhance natural warmth and give a healthy glow.",
                hair: "Golden brown, copper brown",
                clothing: "Light tones: Coral, peach, salmon | Dark tones: Olive, khaki, mustard | Neutrals: Beige, ivory, cream",
                makeup: "Lips: Coral, orange-red, brick | Eyes: Gold, bronze, warm brown | Blush: Peach, coral, apricot",
                image: "images/warm_tone.png",
            },
        ),
    ],
    fallback: ToneEntry {
        summary: "No palette data found for this tone.",
        hair: "-",
        clothing: "-",
        makeup: "-",
        image: "",
    },
};

/// Entry shown when a guide is browsed manually.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuideEntry {
    Hairstyle(Lookup<RecommendationEntry>),
    Palette(Lookup<ToneEntry>),
}

impl GuideEntry {
    pub fn found(&self) -> bool {
        match self {
            GuideEntry::Hairstyle(lookup) => lookup.found,
            GuideEntry::Palette(lookup) => lookup.found,
        }
    }
}

/// Guide for a slot's labels, independent of any classification result.
pub fn browse(slot: ModelSlot, label: &str) -> GuideEntry {
    match slot {
        ModelSlot::FaceShape => GuideEntry::Hairstyle(FACE_SHAPE_TABLE.lookup(label)),
        ModelSlot::PersonalTone => GuideEntry::Palette(PERSONAL_TONE_TABLE.lookup(label)),
    }
}
