use super::{LineStyle, ThemeError, ThemeId};
use crate::geometry::Color;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileLayer {
    pub name: &'static str,
    pub url: &'static str,
    pub attribution: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IconSet {
    pub location_marker: &'static str,
    pub pin: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerCategory {
    pub value: &'static str,
    pub label: &'static str,
    pub emoji: &'static str,
}

/// Icons shared by every theme for tool overlays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolIcons {
    pub measure_point: &'static str,
    pub route_start: &'static str,
    pub route_end: &'static str,
    pub waypoint: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThemeSpec {
    pub id: ThemeId,
    pub name: &'static str,
    pub primary: Color,
    pub secondary: Color,
    pub dark: Color,
    pub route: Color,
    pub accent: Color,
    pub tiles: TileLayer,
    pub icons: IconSet,
    pub categories: &'static [MarkerCategory],
}

impl ThemeSpec {
    pub const fn route_line(&self) -> LineStyle {
        LineStyle::solid(self.route, 6, 0.7)
    }

    pub const fn alternative_route_line(&self) -> LineStyle {
        LineStyle::solid(self.accent, 4, 0.6)
    }

    pub const fn measure_line(&self) -> LineStyle {
        LineStyle::dashed(self.accent, 3, 0.8, "5, 10")
    }

    /// Historical path of recorded locations.
    pub const fn path_line(&self) -> LineStyle {
        LineStyle::dashed(self.route, 4, 0.7, "10, 5")
    }

    pub const fn accuracy_circle(&self) -> LineStyle {
        LineStyle::solid(self.route, 1, 0.15)
    }

    pub fn category(&self, value: &str) -> Option<&'static MarkerCategory> {
        self.categories.iter().find(|category| category.value == value)
    }
}

const OSM_CARTO_ATTRIBUTION: &str = "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> | <a href=\"https://carto.com/attributions\">CARTO</a>";
const ARCGIS_ATTRIBUTION: &str = "&copy; <a href=\"https://www.arcgis.com/\">ArcGIS</a>";

pub const SATELLITE_TILES: TileLayer = TileLayer {
    name: "Satellite View",
    url: "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}",
    attribution: ARCGIS_ATTRIBUTION,
};

pub const STREET_TILES: TileLayer = TileLayer {
    name: "Street View",
    url: "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png",
    attribution: "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a>",
};

/// Base map the user picked in the layer control. `Theme` follows the active theme's tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BaseLayer {
    #[default]
    Theme,
    Satellite,
    Street,
}

impl BaseLayer {
    pub const fn tiles(self, theme: &ThemeSpec) -> TileLayer {
        match self {
            Self::Theme => theme.tiles,
            Self::Satellite => SATELLITE_TILES,
            Self::Street => STREET_TILES,
        }
    }
}

impl std::str::FromStr for BaseLayer {
    type Err = ThemeError;

    fn from_str(value: &str) -> Result<Self, ThemeError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "theme" | "default" => Ok(Self::Theme),
            "satellite" => Ok(Self::Satellite),
            "street" | "streets" => Ok(Self::Street),
            _ => Err(ThemeError::UnknownLayer(value.to_string())),
        }
    }
}

pub const TOOL_ICONS: ToolIcons = ToolIcons {
    measure_point: "/icons/rdr2/treasure.svg",
    route_start: "/icons/rdr2/train.svg",
    route_end: "/icons/rdr2/horse.svg",
    waypoint: "/icons/rdr2/waypoint.svg",
};

const GTA5_CATEGORIES: &[MarkerCategory] = &[
    category("default", "Default", "📍"),
    category("safehouse", "Safehouse", "🏠"),
    category("mission", "Mission", "⚔️"),
    category("shop", "Shop", "🛒"),
    category("danger", "Danger", "⚠️"),
    category("garage", "Garage", "🚗"),
    category("clothing", "Clothing", "👕"),
    category("ammu-nation", "Ammu-Nation", "🔫"),
    category("barber", "Barber", "✂️"),
];

const RDR2_CATEGORIES: &[MarkerCategory] = &[
    category("default", "Default", "📍"),
    category("camp", "Camp", "⛺"),
    category("town", "Town", "🏙️"),
    category("quest", "Quest", "📜"),
    category("hunt", "Hunt", "🦌"),
    category("fishing", "Fishing", "🎣"),
    category("gunsmith", "Gun Shop", "🔫"),
    category("saloon", "Saloon", "🥃"),
    category("horse", "Stable", "🐴"),
];

const CYBERPUNK_CATEGORIES: &[MarkerCategory] = &[
    category("default", "Default", "📍"),
    category("apartment", "Apartment", "🏢"),
    category("fixer", "Fixer", "📱"),
    category("ripperdoc", "Ripperdoc", "💉"),
    category("netrunner", "Netrunner", "💻"),
    category("weapon", "Weapon Shop", "🔫"),
    category("bar", "Bar", "🥂"),
    category("fasttravel", "Fast Travel", "⚡"),
    category("danger", "Danger Zone", "☣️"),
];

const GENERIC_CATEGORIES: &[MarkerCategory] = &[
    category("default", "Default", "📍"),
    category("home", "Home", "🏠"),
    category("work", "Work", "💼"),
    category("food", "Food", "🍔"),
    category("shopping", "Shopping", "🛒"),
    category("entertainment", "Entertainment", "🎭"),
    category("landmark", "Landmark", "🗿"),
    category("favorite", "Favorite", "⭐"),
    category("other", "Other", "📌"),
];

const fn category(value: &'static str, label: &'static str, emoji: &'static str) -> MarkerCategory {
    MarkerCategory {
        value,
        label,
        emoji,
    }
}

static THEMES: [ThemeSpec; 4] = [
    ThemeSpec {
        id: ThemeId::Gta5,
        name: "Grand Theft Auto V",
        primary: Color::from_hex(0x00CCFF),
        secondary: Color::from_hex(0xFF00CC),
        dark: Color::from_hex(0x111111),
        route: Color::from_hex(0x00CCFF),
        accent: Color::from_hex(0xFF00CC),
        tiles: TileLayer {
            name: "GTA V Style",
            url: "https://{s}.basemaps.cartocdn.com/dark_all/{z}/{x}/{y}{r}.png",
            attribution: OSM_CARTO_ATTRIBUTION,
        },
        icons: IconSet {
            location_marker: "https://i.imgur.com/HXkZtT2.png",
            pin: "https://i.imgur.com/HXkZtT2.png",
        },
        categories: GTA5_CATEGORIES,
    },
    ThemeSpec {
        id: ThemeId::Rdr2,
        name: "Red Dead Redemption 2",
        primary: Color::from_hex(0xD2A86E),
        secondary: Color::from_hex(0x8B4513),
        dark: Color::from_hex(0x2B2118),
        route: Color::from_hex(0xD2A86E),
        accent: Color::from_hex(0x8B4513),
        tiles: TileLayer {
            name: "RDR2 Style",
            url: "https://{s}.tile.opentopomap.org/{z}/{x}/{y}.png",
            attribution: "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> | <a href=\"https://opentopomap.org\">OpenTopoMap</a>",
        },
        icons: IconSet {
            location_marker: "/icons/rdr2/location-marker.svg",
            pin: "/icons/rdr2/quest.svg",
        },
        categories: RDR2_CATEGORIES,
    },
    ThemeSpec {
        id: ThemeId::Rdr,
        name: "Red Dead Redemption",
        primary: Color::from_hex(0xD2691E),
        secondary: Color::from_hex(0xB8860B),
        dark: Color::from_hex(0x2D1300),
        route: Color::from_hex(0xB8860B),
        accent: Color::from_hex(0x704214),
        tiles: TileLayer {
            name: "RDR Style",
            url: "https://server.arcgisonline.com/ArcGIS/rest/services/World_Topo_Map/MapServer/tile/{z}/{y}/{x}",
            attribution: ARCGIS_ATTRIBUTION,
        },
        icons: IconSet {
            location_marker: "https://i.imgur.com/9KxPMvo.png",
            pin: "https://i.imgur.com/9KxPMvo.png",
        },
        categories: GENERIC_CATEGORIES,
    },
    ThemeSpec {
        id: ThemeId::Cyberpunk2077,
        name: "Cyberpunk 2077",
        primary: Color::from_hex(0xFCEE09),
        secondary: Color::from_hex(0xFF0077),
        dark: Color::from_hex(0x050716),
        route: Color::from_hex(0xFFFF00),
        accent: Color::from_hex(0xFF00FF),
        tiles: TileLayer {
            name: "Cyberpunk Style",
            url: "https://{s}.basemaps.cartocdn.com/dark_nolabels/{z}/{x}/{y}{r}.png",
            attribution: OSM_CARTO_ATTRIBUTION,
        },
        icons: IconSet {
            location_marker: "https://i.imgur.com/xU1Jr6S.png",
            pin: "https://i.imgur.com/xU1Jr6S.png",
        },
        categories: CYBERPUNK_CATEGORIES,
    },
];

/// Pure lookup into the static theme table.
pub fn resolve(id: ThemeId) -> &'static ThemeSpec {
    match id {
        ThemeId::Gta5 => &THEMES[0],
        ThemeId::Rdr2 => &THEMES[1],
        ThemeId::Rdr => &THEMES[2],
        ThemeId::Cyberpunk2077 => &THEMES[3],
    }
}
