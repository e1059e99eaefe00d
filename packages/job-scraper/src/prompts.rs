//! Instructions sent to the extraction service.
//!
//! Each instruction is immediately followed by its payload in a single user
//! message, so they end where the payload begins.

/// Pick job-detail links out of a comma-joined list of hrefs.
pub const LINK_SELECTION: &str = "Of these links, which ones most likely forward to the details \
of a particular job posting? Respond only with a valid JSON array of strings, copying each \
chosen link exactly as given: ";

/// Ask for a single regular expression matching job-detail hrefs.
pub const LINK_PATTERN: &str = "Of these links, which ones most likely forward to the details \
of a particular job posting? Respond only with one regular expression that matches exactly \
those links, with no explanation and no surrounding quotes: ";

/// Pull a structured record out of a detail page's visible text.
pub const JOB_DETAILS: &str = "Can you give me the company (string), jobTitle (string), \
location (string), industry (string), responsibilities (array of strings), qualifications \
(array of strings), and skills (array of strings) of this job listing in valid JSON? Use \
exactly those keys. If a value is not given, use \"N/A\" for strings and [\"N/A\"] for arrays. \
Respond with the JSON object only. Job listing: ";

/// Separator used when joining hrefs into the link-selection payload.
pub const LINK_SEPARATOR: &str = ",";
