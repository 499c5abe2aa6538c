//! Name tables for world generation
//!
//! Static pools the generator samples from. Town names must stay
//! unique across a world and street names within a town, so both pools
//! are comfortably larger than any plausible draw count; person names
//! are allowed to repeat.

pub const TOWN_NAMES: &[&str] = &[
    "Roothaven",
    "Milltown",
    "Ashford",
    "Briarwick",
    "Coldbrook",
    "Dunmere",
    "Eastvale",
    "Fernhollow",
    "Graystone",
    "Hartfield",
    "Ivydale",
    "Juniper Flats",
    "Kestrel Point",
    "Larkspur",
    "Maplewood",
    "Northgate",
    "Oakridge",
    "Pinecrest",
    "Quarry Hill",
    "Redmoor",
    "Saltmarsh",
    "Thornbury",
    "Umberfield",
    "Violet Glen",
    "Westwick",
    "Yarrow",
    "Alderton",
    "Birchbarrow",
    "Cinderfall",
    "Dovercourt",
    "Elmsworth",
    "Foxglove",
    "Gullwing",
    "Hollowbrook",
    "Ironvale",
    "Jasperton",
    "Kilnview",
    "Lindenmere",
    "Mossgrove",
    "Nettleford",
    "Osprey Landing",
    "Peatmoor",
    "Quillhaven",
    "Rushwater",
    "Stonebridge",
    "Tallow Creek",
    "Wrenfield",
    "Zephyr Bay",
];

pub const STREET_NAMES: &[&str] = &[
    "Main Street",
    "High Street",
    "Church Lane",
    "Mill Road",
    "Station Road",
    "Market Square",
    "Oak Avenue",
    "Elm Street",
    "Maple Drive",
    "Birch Close",
    "Willow Way",
    "Cedar Court",
    "Rosemary Lane",
    "Harbor Road",
    "Bridge Street",
    "Garden Walk",
    "Orchard Row",
    "Meadow Lane",
    "Hillcrest Drive",
    "Valley Road",
    "River Street",
    "Brook Lane",
    "Forge Alley",
    "Cooper Street",
    "Wheelwright Way",
    "Tanner Row",
    "Fletcher Lane",
    "Mason Street",
    "Thatcher Close",
    "Granary Road",
    "Chapel Hill",
    "Bell Street",
    "Lantern Lane",
    "Smithy Yard",
    "Drover's Way",
    "Ferry Lane",
    "Quay Street",
    "Windmill Rise",
    "Heather Walk",
    "Clover Court",
    "Primrose Path",
    "Foxhole Lane",
    "Badger Row",
    "Swallow Street",
];

pub const FIRST_NAMES: &[&str] = &[
    "Ada", "Alfred", "Beatrice", "Bernard", "Clara", "Cedric", "Dora",
    "Duncan", "Edith", "Edmund", "Flora", "Felix", "Greta", "Gilbert",
    "Hazel", "Hugo", "Iris", "Ivor", "June", "Jasper", "Kitty", "Leopold",
    "Lydia", "Martin", "Mabel", "Nolan", "Nora", "Oscar", "Opal", "Percy",
    "Pearl", "Quentin", "Rosa", "Rupert", "Sylvia", "Silas", "Tessa",
    "Tobias", "Una", "Victor", "Vera", "Wallace", "Winifred", "Xavier",
    "Yvonne", "Zachary", "Agnes", "Horace",
];

pub const LAST_NAMES: &[&str] = &[
    "Abbott", "Barlow", "Carver", "Dunlop", "Eastman", "Fenwick",
    "Granger", "Hollis", "Ingram", "Jessop", "Kendall", "Lockwood",
    "Mercer", "Nash", "Oakley", "Pemberton", "Quigley", "Rowntree",
    "Sutton", "Thorne", "Underhill", "Vance", "Whitlock", "Yates",
    "Ashby", "Blythe", "Crane", "Dewhurst", "Elford", "Fairbanks",
    "Goodwin", "Hartley", "Irwin", "Jardine", "Kirby", "Langley",
    "Mowbray", "Norwood", "Ormsby", "Prescott", "Quince", "Redfern",
    "Stanhope", "Tilney", "Upton", "Venn", "Winslow", "Youngblood",
];
