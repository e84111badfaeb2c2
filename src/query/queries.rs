/// Listing lookup
pub const GET_LISTING: &str = r#"
    SELECT id, title, description, listed_price, minimum_price, current_price,
           created_at, end_date, is_bought, buyer_id, buyer_email,
           seller_id, seller_email, image_url, communities
    FROM listings
    WHERE id = $1
"#;

/// All listings, newest first
pub const GET_ALL_LISTINGS: &str = r#"
    SELECT id, title, description, listed_price, minimum_price, current_price,
           created_at, end_date, is_bought, buyer_id, buyer_email,
           seller_id, seller_email, image_url, communities
    FROM listings
    ORDER BY created_at DESC
"#;

/// Open listings only (re-pricing loop input)
pub const GET_ACTIVE_LISTINGS: &str = r#"
    SELECT id, title, description, listed_price, minimum_price, current_price,
           created_at, end_date, is_bought, buyer_id, buyer_email,
           seller_id, seller_email, image_url, communities
    FROM listings
    WHERE is_bought = FALSE
    ORDER BY created_at DESC
"#;

/// Listings tagged with a community
pub const GET_LISTINGS_BY_COMMUNITY: &str = r#"
    SELECT id, title, description, listed_price, minimum_price, current_price,
           created_at, end_date, is_bought, buyer_id, buyer_email,
           seller_id, seller_email, image_url, communities
    FROM listings
    WHERE $1 = ANY(communities)
    ORDER BY created_at DESC
"#;

/// Listings owned by a seller
pub const GET_LISTINGS_BY_SELLER: &str = r#"
    SELECT id, title, description, listed_price, minimum_price, current_price,
           created_at, end_date, is_bought, buyer_id, buyer_email,
           seller_id, seller_email, image_url, communities
    FROM listings
    WHERE seller_id = $1
    ORDER BY created_at DESC
"#;

/// Wishlist contents joined onto the listing rows
pub const GET_WISHLIST_LISTINGS: &str = r#"
    SELECT l.id, l.title, l.description, l.listed_price, l.minimum_price, l.current_price,
           l.created_at, l.end_date, l.is_bought, l.buyer_id, l.buyer_email,
           l.seller_id, l.seller_email, l.image_url, l.communities
    FROM listings l
    JOIN wishlist w ON w.listing_id = l.id
    WHERE w.user_id = $1
    ORDER BY w.added_at DESC
"#;
