mod health_check;
mod users;

pub use health_check::health_check;
pub use users::{
    add_friend, extend, get_current_user, login, logout, register, update_current_user,
    AddFriendRequest, FriendsResponse, LoginRequest, LoginResponse, TokenResponse,
};
