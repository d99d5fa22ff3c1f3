use std::time::Duration;

// JWT Configuration
pub const JWT_ACCESS_TOKEN_EXPIRY: Duration = Duration::from_secs(15 * 60); // 15 minutes

// Participation lifecycle
pub const DEFAULT_PENDING_TTL_DAYS: i64 = 7;
pub const DEFAULT_WAITLIST_FREEZE_LEAD_SECS: i64 = 60 * 60; // one sweep interval

// Event channel
pub const PARTICIPATION_EVENT_BUFFER: usize = 256;

// Error messages
pub const ERROR_HUNT_NOT_FOUND: &str = "Hunt not found";
pub const ERROR_USER_NOT_FOUND: &str = "User not found";
pub const ERROR_PARTICIPANT_NOT_FOUND: &str = "Participant not found";
pub const ERROR_ALREADY_JOINED: &str = "Already joined this hunt";
pub const ERROR_ALREADY_REVIEWED: &str = "Join request has already been reviewed";
pub const ERROR_ORGANIZER_ONLY: &str = "Only the hunt organizer can perform this action";
pub const ERROR_ORGANIZER_CANNOT_JOIN: &str = "Organizers cannot join their own hunt";
pub const ERROR_ORGANIZER_CANNOT_LEAVE: &str = "Organizers cannot leave their own hunt";
pub const ERROR_ALREADY_CANCELLED: &str = "Participation is already cancelled";
pub const ERROR_HUNT_STARTED: &str = "Hunt has already started";
pub const ERROR_UNAUTHORIZED: &str = "Unauthorized access";
pub const ERROR_FORBIDDEN: &str = "Access forbidden";
