use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingType {
    Sale,
    Rent,
    /// Any value the backend sends that this build does not know
    #[serde(other)]
    Unknown,
}

impl Default for ListingType {
    fn default() -> Self {
        Self::Unknown
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    House,
    Apartment,
    Land,
    Commercial,
    Office,
    Warehouse,
    Building,
    Townhouse,
    #[serde(other)]
    Unknown,
}

impl Default for PropertyType {
    fn default() -> Self {
        Self::Unknown
    }
}

/// Optional listing filters; an absent field means "unfiltered"
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapFilters {
    pub listing_type: Option<ListingType>,
    pub property_type: Option<PropertyType>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub bedrooms_min: Option<u32>,
    pub bathrooms_min: Option<f64>,
    pub state: Option<String>,
    pub municipality: Option<String>,
    pub colonia: Option<String>,
}

impl MapFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listing_type(mut self, listing_type: ListingType) -> Self {
        self.listing_type = Some(listing_type);
        self
    }

    pub fn property_type(mut self, property_type: PropertyType) -> Self {
        self.property_type = Some(property_type);
        self
    }

    pub fn price_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.price_min = min;
        self.price_max = max;
        self
    }

    pub fn bedrooms_min(mut self, bedrooms: u32) -> Self {
        self.bedrooms_min = Some(bedrooms);
        self
    }

    pub fn bathrooms_min(mut self, bathrooms: f64) -> Self {
        self.bathrooms_min = Some(bathrooms);
        self
    }

    pub fn location(
        mut self,
        state: Option<&str>,
        municipality: Option<&str>,
        colonia: Option<&str>,
    ) -> Self {
        self.state = state.map(str::to_string);
        self.municipality = municipality.map(str::to_string);
        self.colonia = colonia.map(str::to_string);
        self
    }

    /// Trims text fields and treats blank text or non-finite numbers as absent
    pub fn normalized(&self) -> Self {
        let text = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let number = |v: Option<f64>| v.filter(|n| n.is_finite());

        Self {
            listing_type: self.listing_type,
            property_type: self.property_type,
            price_min: number(self.price_min),
            price_max: number(self.price_max),
            bedrooms_min: self.bedrooms_min,
            bathrooms_min: number(self.bathrooms_min),
            state: text(&self.state),
            municipality: text(&self.municipality),
            colonia: text(&self.colonia),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.normalized() == Self::default()
    }

    /// Deterministic serialized form used inside cache keys
    pub fn cache_fragment(&self) -> String {
        serde_json::to_string(&self.normalized()).unwrap_or_default()
    }
}
