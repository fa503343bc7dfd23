/// Key used to index block rows. It is never a column of its own.
pub const BLOCK_ID_FIELD: &str = "Block Group Identification Number";

/// Column filled from each placemark's title table rather than its data table.
pub const BLOCK_GROUP_FIELD: &str = "Block Group";

pub const TOWN_FIELD: &str = "Town";

pub const FIELD_COUNT: usize = 32;

/// Output columns of the consolidated table, in order.
pub const FIELDS: [&str; FIELD_COUNT] = [
    BLOCK_GROUP_FIELD,
    TOWN_FIELD,
    "Active Electric Locations, 2019",
    "Active Electric Accounts as of December, 2019",
    "2013 Electric Location Participation Rate",
    "2014 Electric Location Participation Rate",
    "2015 Electric Location Participation Rate",
    "2016 Electric Location Participation Rate",
    "2017 Electric Location Participation Rate",
    "2018 Electric Location Participation Rate",
    "2019 Electric Location Participation Rate",
    "2013-2019 Total Electric Location Participation Rate",
    "2013-2019 Total Electric Location Participation Rate Rank",
    "2013-2019 Electric location participation rate percentage points difference from town mean",
    "Active Gas Locations, 2019",
    "Active Gas Accounts as of December, 2019",
    "2013 Gas Location Participation Rate",
    "2014 Gas Location Participation Rate",
    "2015 Gas Location Participation Rate",
    "2016 Gas Location Participation Rate",
    "2017 Gas Location Participation Rate",
    "2018 Gas Location Participation Rate",
    "2019 Gas Location Participation Rate",
    "2013-2019 Total Gas Location Participation Rate",
    "2013-2019 Total Gas Location Participation Rate Rank",
    "2013-2019 Gas location participation rate percentage points difference from town mean",
    "2018 Block Group rank ordered by share of income eligible households",
    "2018 ACS Share of income eligible households",
    "2018 Block Group rank ordered by share of renter occupied households",
    "2018 ACS Share of renter occupied households",
    "2018 Block Group rank ordered by share of limited english proficiency households",
    "2018 ACS Share of limited english proficiency households",
];

/// Column index of `name`, or `None` if it is not an output column.
pub fn position(name: &str) -> Option<usize> {
    FIELDS.iter().position(|f| *f == name)
}
