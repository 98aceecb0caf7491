//! The per-recipient products grid inserted at `{{PRODUCTS_HTML}}`.

use dropmail_core::ProductSlot;

use crate::escape_html;

pub const NO_PRODUCTS: &str = "<!-- No products available -->";

const FONT: &str = "'Helvetica Neue', Helvetica, Arial, sans-serif";

/// Size class for one grid cell.
struct CellStyle {
    width_percent: u8,
    image_max_px: u16,
    name_px: u8,
    price_px: u8,
    button_padding: &'static str,
    button_font: &'static str,
}

const WIDE: CellStyle = CellStyle {
    width_percent: 100,
    image_max_px: 300,
    name_px: 16,
    price_px: 20,
    button_padding: "12px 24px",
    button_font: "",
};

const HALF: CellStyle = CellStyle {
    width_percent: 50,
    image_max_px: 250,
    name_px: 14,
    price_px: 18,
    button_padding: "8px 16px",
    button_font: "font-size:12px;",
};

/// Renders up to four product slots as table cells.
///
/// Slots without an image are skipped. One product gets a single wide cell;
/// two or more are laid out two per row with `</tr><tr>` between rows.
#[must_use]
pub fn products_html(slots: &[ProductSlot]) -> String {
    let shown: Vec<&ProductSlot> = slots.iter().filter(|s| !s.image.is_empty()).collect();

    match shown.as_slice() {
        [] => NO_PRODUCTS.to_string(),
        [only] => cell(only, &WIDE),
        many => {
            let count = many.len();
            let mut html = String::new();
            for (i, slot) in many.iter().enumerate() {
                html.push_str(&cell(slot, &HALF));
                let position = i + 1;
                if position % 2 == 0 && position < count {
                    html.push_str("</tr><tr>");
                }
            }
            html
        }
    }
}

fn cell(slot: &ProductSlot, style: &CellStyle) -> String {
    let link = if slot.link.is_empty() {
        "#".to_string()
    } else {
        escape_html(&slot.link)
    };
    let image = escape_html(&slot.image);
    let name = escape_html(&slot.name);
    let alt = if name.is_empty() { "Product".to_string() } else { name.clone() };
    let price = if slot.price.is_empty() {
        "0.00".to_string()
    } else {
        escape_html(&slot.price)
    };

    format!(
        r#"
<td width="{width}%" style="padding:0 10px;">
<table border="0" cellpadding="0" cellspacing="0" width="100%">
<tr><td align="center" style="height:250px;">
<a href="{link}" target="_blank">
<img src="{image}" alt="{alt}" style="display:block;border:0;max-width:{max}px;max-height:{max}px;border-radius:8px;" />
</a>
</td></tr>
<tr><td align="center" style="padding-top:10px;">
<p style="font-family:{FONT};font-size:{name_px}px;color:#333333;margin:0 0 5px 0;">{name}</p>
<p style="font-family:{FONT};font-size:{price_px}px;font-weight:bold;color:#000000;margin:0 0 10px 0;">${price}</p>
<a href="{link}" target="_blank" style="display:inline-block;background-color:#000000;color:#ffffff;padding:{padding};text-decoration:none;border-radius:4px;font-family:{FONT};{button_font}">Shop Now</a>
</td></tr>
</table>
</td>
"#,
        width = style.width_percent,
        max = style.image_max_px,
        name_px = style.name_px,
        price_px = style.price_px,
        padding = style.button_padding,
        button_font = style.button_font,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(n: usize, price: &str) -> ProductSlot {
        ProductSlot {
            link: format!("https://shop.example.com/products/p{n}"),
            image: format!("https://img.example.com/p{n}.png"),
            price: price.to_string(),
            name: format!("Product {n}"),
        }
    }

    #[test]
    fn no_products_renders_comment() {
        assert_eq!(products_html(&[]), NO_PRODUCTS);
    }

    #[test]
    fn imageless_slots_are_not_counted() {
        let mut s = slot(1, "5.00");
        s.image.clear();
        assert_eq!(products_html(&[s]), NO_PRODUCTS);
    }

    #[test]
    fn single_product_uses_wide_cell() {
        let html = products_html(&[slot(1, "19.99")]);
        assert!(html.contains(r#"width="100%" style="padding:0 10px;""#));
        assert!(html.contains("max-width:300px"));
        assert!(html.contains("$19.99"));
        assert!(!html.contains("</tr><tr>"));
    }

    #[test]
    fn price_is_emitted_verbatim() {
        let html = products_html(&[slot(1, "20")]);
        assert!(html.contains("$20<"));
        assert!(!html.contains("$20.00"));
    }

    #[test]
    fn three_products_break_after_second_cell_only() {
        let html = products_html(&[slot(1, "1"), slot(2, "2"), slot(3, "3")]);
        assert_eq!(html.matches("</tr><tr>").count(), 1);
        assert_eq!(html.matches(r#"<td width="50%""#).count(), 3);
        let brk = html.find("</tr><tr>").unwrap();
        assert!(html[..brk].contains("Product 2"));
        assert!(html[brk..].contains("Product 3"));
    }

    #[test]
    fn four_products_have_no_trailing_break() {
        let html = products_html(&[slot(1, "1"), slot(2, "2"), slot(3, "3"), slot(4, "4")]);
        assert_eq!(html.matches("</tr><tr>").count(), 1);
        assert!(!html.trim_end().ends_with("</tr><tr>"));
    }

    #[test]
    fn urls_are_escaped_inside_attributes() {
        let mut s = slot(1, "9.99");
        s.image = r#"https://img.example.com/a".png"#.to_string();
        s.link = "https://shop.example.com/p?a=1&b=2".to_string();
        let html = products_html(&[s]);
        assert!(html.contains(r#"src="https://img.example.com/a&quot;.png""#));
        assert!(html.contains(r#"href="https://shop.example.com/p?a=1&amp;b=2""#));
        assert!(!html.contains(r#"a".png"#));
    }

    #[test]
    fn shop_now_points_at_product_link() {
        let html = products_html(&[slot(7, "9.99")]);
        assert_eq!(
            html.matches(r#"href="https://shop.example.com/products/p7""#).count(),
            2
        );
    }
}
