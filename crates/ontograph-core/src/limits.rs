//! Input validation limits for traversal cost and resource protection

/// Maximum length for entity ids (256 bytes)
pub const MAX_ENTITY_ID_LEN: usize = 256;

/// Default path search depth (4)
pub const DEFAULT_PATH_DEPTH: u32 = 4;

/// Maximum path search depth (8)
pub const MAX_PATH_DEPTH: u32 = 8;

/// Default number of shortest paths returned (16)
pub const DEFAULT_MAX_PATHS: usize = 16;

/// Maximum number of shortest paths returned (100)
pub const MAX_PATHS: usize = 100;

/// Maximum entries in a centrality or similarity ranking (1000)
pub const MAX_RANKING_LIMIT: usize = 1000;

/// Validation error type
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    EmptyEntityId,
    EntityIdTooLong { len: usize, max: usize },
    PathDepthTooLarge { depth: u32, max: u32 },
    TooManyPaths { count: usize, max: usize },
    ZeroPaths,
    RankingLimitTooLarge { limit: usize, max: usize },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyEntityId => write!(f, "Entity id cannot be empty"),
            Self::EntityIdTooLong { len, max } => {
                write!(f, "Entity id too long: {} bytes (max {})", len, max)
            }
            Self::PathDepthTooLarge { depth, max } => {
                write!(f, "Path depth too large: {} (max {})", depth, max)
            }
            Self::TooManyPaths { count, max } => {
                write!(f, "Too many paths requested: {} (max {})", count, max)
            }
            Self::ZeroPaths => write!(f, "Path count must be at least 1"),
            Self::RankingLimitTooLarge { limit, max } => {
                write!(f, "Ranking limit too large: {} (max {})", limit, max)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate entity id
pub fn validate_entity_id(id: &str) -> Result<(), ValidationError> {
    if id.is_empty() {
        return Err(ValidationError::EmptyEntityId);
    }
    if id.len() > MAX_ENTITY_ID_LEN {
        return Err(ValidationError::EntityIdTooLong {
            len: id.len(),
            max: MAX_ENTITY_ID_LEN,
        });
    }
    Ok(())
}

/// Validate path search depth
pub fn validate_path_depth(depth: u32) -> Result<(), ValidationError> {
    if depth > MAX_PATH_DEPTH {
        return Err(ValidationError::PathDepthTooLarge {
            depth,
            max: MAX_PATH_DEPTH,
        });
    }
    Ok(())
}

/// Validate the number of paths a search may return
pub fn validate_max_paths(count: usize) -> Result<(), ValidationError> {
    if count == 0 {
        return Err(ValidationError::ZeroPaths);
    }
    if count > MAX_PATHS {
        return Err(ValidationError::TooManyPaths {
            count,
            max: MAX_PATHS,
        });
    }
    Ok(())
}

/// Validate ranking limit
pub fn validate_ranking_limit(limit: usize) -> Result<(), ValidationError> {
    if limit > MAX_RANKING_LIMIT {
        return Err(ValidationError::RankingLimitTooLarge {
            limit,
            max: MAX_RANKING_LIMIT,
        });
    }
    Ok(())
}
