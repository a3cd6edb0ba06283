mod blocked_users;
mod suggestions;
