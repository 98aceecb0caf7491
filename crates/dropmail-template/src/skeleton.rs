//! The fixed HTML skeleton every campaign template starts from.

/// Email-safe table layout with one `{{KEY}}` token per editable region.
pub const STANDARD_TEMPLATE: &str = r##"<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:v="urn:schemas-microsoft-com:vml" xmlns:o="urn:schemas-microsoft-com:office:office">
<head>
<title>{{CAMPAIGN_TITLE}}</title>
<!--[if !mso]><!-->
<meta http-equiv="X-UA-Compatible" content="IE=edge">
<!--<![endif]-->
<meta http-equiv="Content-Type" content="text/html; charset=UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<style type="text/css">
#outlook a { padding:0; }
body { margin:0;padding:0;-webkit-text-size-adjust:100%;-ms-text-size-adjust:100%; }
table, td { border-collapse:collapse;mso-table-lspace:0pt;mso-table-rspace:0pt; }
img { border:0;height:auto;line-height:100%; outline:none;text-decoration:none;-ms-interpolation-mode:bicubic; }
</style>
</head>
<body>
<center>
<table border="0" cellpadding="0" cellspacing="0" height="100%" width="100%" style="background-color: #f4f4f4;">
<tbody><tr>
<td align="center" valign="top">
<table border="0" cellpadding="0" cellspacing="0" width="100%" style="max-width:660px;">
<tbody>

<!-- HEADER SECTION -->
<tr id="header-section"><td style="background-color:#ffffff; padding:12px 48px; text-align:center;">
<img alt="{{COMPANY_NAME}}" src="{{COMPANY_LOGO_URL}}" width="172" height="auto" style="display:block; max-width:100%; height:auto; margin:0 auto;" />
</td></tr>

<!-- MAIN TITLE SECTION -->
<tr id="title-section"><td style="background-color:#ffffff; padding:20px 24px; text-align:center;">
<div style="border-top:2px solid #000000; margin-bottom:20px;"></div>
<h1 style="font-family:'Helvetica Neue', Helvetica, Arial, sans-serif; font-size:{{TITLE_FONT_SIZE}}; font-weight:bold; color:{{TITLE_COLOR}}; margin:0; line-height:1.2;">
{{MAIN_TITLE}}
</h1>
</td></tr>

<!-- HERO IMAGE SECTION -->
<tr id="hero-section"><td style="background-color:#ffffff; padding:12px 0;">
<a href="{{HERO_LINK}}" target="_blank">
<img src="{{HERO_IMAGE_URL}}" alt="{{HERO_ALT_TEXT}}" style="display:block; max-width:100%; height:auto; border-radius:10px;" />
</a>
</td></tr>

<!-- CONTENT SECTION -->
<tr id="content-section"><td style="background-color:#ffffff; padding:12px 24px; text-align:center;">
<p style="font-family:'Helvetica Neue', Helvetica, Arial, sans-serif; font-size:16px; color:#000000; margin:10px 0;">
{{GREETING_TEXT}}
</p>
<p style="font-family:'Helvetica Neue', Helvetica, Arial, sans-serif; font-size:16px; color:#000000; margin:10px 0;">
{{DESCRIPTION_TEXT}}
</p>
</td></tr>

<!-- PRODUCTS SECTION -->
<tr id="products-section"><td style="background-color:#ffffff; padding:20px 24px; text-align:center;">
<h2 style="font-family:'Helvetica Neue', Helvetica, Arial, sans-serif; font-size:24px; font-weight:bold; color:#000000; margin:0 0 10px 0;">
{{PRODUCTS_TITLE}}
</h2>
<p style="font-family:'Helvetica Neue', Helvetica, Arial, sans-serif; font-size:16px; color:#000000; margin:0 0 20px 0;">
{{PRODUCTS_SUBTITLE}}
</p>

<!-- DYNAMIC PRODUCTS GRID -->
<table align="center" width="100%" style="max-width:600px;">
<tr>
{{PRODUCTS_HTML}}
</tr>
</table>

</td></tr>

<!-- CTA SECTION -->
<tr id="cta-section"><td style="background-color:#ffffff; padding:12px 24px; text-align:center;">
<a href="{{CTA_LINK}}" target="_blank" style="display:inline-block; background-color:{{CTA_BG_COLOR}}; color:{{CTA_TEXT_COLOR}}; padding:16px 28px; text-decoration:none; border-radius:4px; font-family:'Helvetica Neue', Helvetica, Arial, sans-serif; font-size:16px; font-weight:bold;">
{{CTA_TEXT}}
</a>
</td></tr>

<tr><td style="background-color:#ffffff;">
<div style="border-top:2px solid #000000; margin:20px 24px;"></div>
</td></tr>

<!-- FOOTER SECTION -->
<tr id="footer-section"><td style="background-color:#1d1d1d; padding:20px 0; text-align:center;">
<table style="margin:0 auto;" cellpadding="0" cellspacing="0">
<tr>
<td style="padding:0 10px;">
<a href="https://www.facebook.com/rrinconline/" target="_blank">
<img width="40" height="40" alt="Facebook" src="https://cdn-images.mailchimp.com/icons/social-block-v3/block-icons-v3/facebook-filled-light-40.png" style="border-radius:50%; display:block;">
</a></td>
<td style="padding:0 10px;">
<a href="https://www.instagram.com/rrinc/" target="_blank">
<img width="40" height="40" alt="Instagram" src="https://cdn-images.mailchimp.com/icons/social-block-v3/block-icons-v3/instagram-filled-light-40.png" style="border-radius:50%; display:block;">
</a></td>
<td style="padding:0 10px;">
<a href="https://www.tiktok.com/@randrinc" target="_blank">
<img width="40" height="40" alt="TikTok" src="https://cdn-images.mailchimp.com/icons/social-block-v3/block-icons-v3/tiktok-filled-light-40.png" style="border-radius:50%; display:block;">
</a></td>
</tr>
</table>
<p style="color:#ffffff; font-size:12px; margin:10px 20px; font-family:'Helvetica Neue', Helvetica, Arial, sans-serif;">
Our mailing address is:<br><strong>{{COMPANY_NAME}}</strong><br>{{COMPANY_ADDRESS}}
</p>
<p style="margin:10px 20px; text-align:center;">
<a href="{{UNSUBSCRIBE_URL}}" style="color:#ffffff; text-decoration:underline; font-size:12px;">Unsubscribe here</a>
</p>
</td></tr>

</tbody></table>
</td></tr></tbody></table>
</center>
</body>
</html>"##;
