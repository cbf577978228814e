pub const TABLE_GUEST_CARDS: &str = "guest_cards";
pub const TABLE_NEARBY_UNITS: &str = "nearby_units";

pub const SOURCE_GUEST_CARDS: &str = "synthetic_guest_cards.csv";
pub const SOURCE_NEARBY_UNITS: &str = "nearby_advertised_units.csv";

// guest_cards source columns
pub const COL_NAME: &str = "Name";
pub const COL_INTEREST_RECEIVED: &str = "Interest Received";
pub const COL_LAST_ACTIVITY_DATE: &str = "Last Activity Date";
pub const COL_LAST_ACTIVITY_TYPE: &str = "Last Activity Type";
pub const COL_STATUS: &str = "Status";
pub const COL_MOVE_IN_PREFERENCE: &str = "Move In Preference";
pub const COL_MAX_RENT: &str = "Max Rent";
pub const COL_BED_BATH_PREFERENCE: &str = "Bed/Bath Preference";
pub const COL_PET_PREFERENCE: &str = "Pet Preference";
pub const COL_MONTHLY_INCOME: &str = "Monthly Income";
pub const COL_CREDIT_SCORE: &str = "Credit Score";

// guest_cards derived columns
pub const COL_MAX_RENT_AMOUNT: &str = "Max_Rent_Amount";
pub const COL_MONTHLY_INCOME_AMOUNT: &str = "Monthly_Income_Amount";

// nearby_units source columns
pub const COL_SIMILARITY: &str = "Similarity";
pub const COL_BEDS: &str = "Beds";
pub const COL_BATHS: &str = "Baths";
pub const COL_SQFT: &str = "Sqft";
pub const COL_SQFT_COMPARISON: &str = "Sqft Comparison";
pub const COL_LOCATION: &str = "Location";
pub const COL_LAST_ADVERTISED_DATE: &str = "Last Advertised Date";
pub const COL_ADVERTISED_RENT: &str = "Advertised Rent";
pub const COL_RENT_PRICE_COMPARISON: &str = "Rent Price Comparison";

// nearby_units derived columns
pub const COL_SIMILARITY_PCT: &str = "Similarity_Pct";
pub const COL_RENT_AMOUNT: &str = "Rent_Amount";
pub const COL_RENT_COMPARISON: &str = "Rent_Comparison";
pub const COL_SQFT_COMPARISON_DELTA: &str = "Sqft_Comparison";

/// Advertised rent of the subject property that comparisons are made against.
pub const SUBJECT_RENT: f64 = 2400.0;
/// Approximate square footage of the subject property.
pub const SUBJECT_SQFT: f64 = 915.0;

/// Status value marking a prospect as active.
pub const STATUS_ACTIVE: &str = "Active";
